//! Download gate: a verified token plus one unused download releases the content.

use crate::{
    error::{AppError, AppResult},
    providers::{FileContent, drive::extract_file_id},
    state::AppState,
    store,
    token::DownloadClaims,
};

pub async fn open_download(
    state: &AppState,
    claims: &DownloadClaims,
    book_id: &str,
) -> AppResult<FileContent> {
    let purchase = store::find_completed_purchase(&state.orm, claims.purchase_id, &claims.email)
        .await?
        .filter(|purchase| purchase.book_id == book_id)
        .ok_or_else(|| AppError::NotFound("Purchase not found".into()))?;

    let book = store::find_book(&state.orm, &purchase.book_id).await?;
    let file_id = book
        .drive_link
        .as_deref()
        .and_then(extract_file_id)
        .ok_or_else(|| AppError::NotFound("Book file not available".into()))?;

    if !store::claim_download(&state.orm, purchase.id).await? {
        tracing::info!(purchase_id = %purchase.id, "download limit exceeded");
        return Err(AppError::NotFound("Download limit exceeded".into()));
    }

    match state.drive.fetch_content(&file_id).await {
        Ok(content) => {
            tracing::info!(
                purchase_id = %purchase.id,
                %file_id,
                file_name = %content.file_name,
                "download released"
            );
            Ok(content)
        }
        Err(err) => {
            store::release_download(&state.orm, purchase.id).await?;
            Err(err.into())
        }
    }
}
