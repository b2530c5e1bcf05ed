//! Grant a reader access to a file located by folder and file name.
//!
//! Usage: `grant <folder-id> <file-name> <email>`

use anyhow::{Context, bail};
use audiobook_store::{
    config::AppConfig,
    providers::{AccessProvider, GoogleDriveClient},
    store::normalize_email,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,audiobook_store=debug".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [folder_id, file_name, email] = args.as_slice() else {
        bail!("usage: grant <folder-id> <file-name> <email>");
    };
    let email = normalize_email(email);

    let config = AppConfig::from_env()?;
    let drive = GoogleDriveClient::from_service_account_file(&config.drive.service_account_path)?;

    let files = drive.list_files_in_folder(folder_id).await?;
    let file = files
        .iter()
        .find(|file| file.name == *file_name)
        .with_context(|| format!("no file named {file_name:?} in folder {folder_id}"))?;

    let permission = drive.grant_access(&file.id, &email).await?;
    println!(
        "Granted {email} read access to {} ({}), permission {}",
        file.name, file.id, permission.id
    );
    if let Some(link) = &file.web_view_link {
        println!("{link}");
    }
    Ok(())
}
