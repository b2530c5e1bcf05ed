use crate::{
    entity::books,
    providers::{AccessProvider, drive::extract_file_id},
};

/// Grant the buyer read access to the book's shared file.
///
/// Failures are logged and reported as `false`.
pub async fn grant_book_access(
    drive: &dyn AccessProvider,
    book: &books::Model,
    email: &str,
) -> bool {
    let Some(link) = book.drive_link.as_deref() else {
        tracing::warn!(book_id = %book.id, "book has no shared file link");
        return false;
    };
    let Some(file_id) = extract_file_id(link) else {
        tracing::error!(book_id = %book.id, %link, "cannot extract file id from shared file link");
        return false;
    };

    match drive.grant_access(&file_id, email).await {
        Ok(permission) => {
            tracing::info!(
                book_id = %book.id,
                %file_id,
                %email,
                permission_id = %permission.id,
                "access granted"
            );
            true
        }
        Err(err) => {
            tracing::error!(
                book_id = %book.id,
                %file_id,
                %email,
                error = %err,
                "failed to grant file access"
            );
            false
        }
    }
}
