//! Email delivery with an audit record per attempt.
//!
//! Provider failures never propagate from here: they are logged and recorded
//! as a FAILED notification for an operator to follow up on.

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{EmailStatus, EmailType},
    providers::LibraryItem,
    state::AppState,
    store,
};

pub async fn deliver_download_link(
    state: &AppState,
    purchase_id: Uuid,
    email: &str,
    download_url: &str,
    title: &str,
    file_link: Option<&str>,
) -> AppResult<EmailStatus> {
    let record =
        store::create_email_record(&state.orm, purchase_id, EmailType::DownloadLink).await?;

    let outcome = match state
        .mailer
        .send_download_link(email, download_url, title, file_link)
        .await
    {
        Ok(message_id) => {
            tracing::info!(%purchase_id, %message_id, "download link sent");
            EmailStatus::Sent
        }
        Err(err) => {
            tracing::error!(%purchase_id, error = %err, "failed to send download link");
            EmailStatus::Failed
        }
    };

    store::finish_email_record(&state.orm, record.id, outcome).await?;
    Ok(outcome)
}

/// Send one library email and record the outcome against every purchase of
/// the address, including those left out of the listing.
pub async fn deliver_library(
    state: &AppState,
    email: &str,
    purchase_ids: &[Uuid],
    items: &[LibraryItem],
) -> AppResult<EmailStatus> {
    let mut records = Vec::with_capacity(purchase_ids.len());
    for purchase_id in purchase_ids {
        let record =
            store::create_email_record(&state.orm, *purchase_id, EmailType::DownloadLink).await?;
        records.push(record);
    }

    let outcome = match state.mailer.send_library(email, items).await {
        Ok(message_id) => {
            tracing::info!(%email, %message_id, count = items.len(), "library email sent");
            EmailStatus::Sent
        }
        Err(err) => {
            tracing::error!(%email, error = %err, "failed to send library email");
            EmailStatus::Failed
        }
    };

    for record in records {
        store::finish_email_record(&state.orm, record.id, outcome).await?;
    }
    Ok(outcome)
}
