//! The maintenance binaries only need a database URL.

use std::path::Path;
use std::process::{Command, Output};

use audiobook_store::entity::Books;
use sea_orm::{Database, EntityTrait, PaginatorTrait};

const BOOKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    description TEXT NOT NULL,
    price BIGINT NOT NULL,
    cover_image TEXT NOT NULL,
    drive_link TEXT,
    created_at TEXT NOT NULL
);";

fn run(bin: &str, dir: &Path, database_url: Option<&str>) -> anyhow::Result<Output> {
    let mut command = Command::new(bin);
    command.env_clear().current_dir(dir);
    if let Some(url) = database_url {
        command.env("DATABASE_URL", url);
    }
    Ok(command.output()?)
}

#[test]
fn migrate_without_database_url_names_the_missing_variable() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("audiobook-store-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;

    let output = run(env!("CARGO_BIN_EXE_migrate"), &dir, None)?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DATABASE_URL is not set"), "{stderr}");
    assert!(!stderr.contains("JWT_SECRET"), "{stderr}");

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn seed_runs_with_only_a_database_url() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("audiobook-store-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("migrations"))?;
    std::fs::write(dir.join("migrations/0001_books.sql"), BOOKS_TABLE)?;
    let url = format!("sqlite://{}?mode=rwc", dir.join("store.db").display());

    // A second run updates the rows in place.
    for _ in 0..2 {
        let output = run(env!("CARGO_BIN_EXE_seed"), &dir, Some(&url))?;
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let orm = Database::connect(url.as_str()).await?;
    assert_eq!(Books::find().count(&orm).await?, 2);
    orm.close().await?;

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
