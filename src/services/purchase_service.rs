use validator::Validate;

use crate::{
    dto::purchases::{DirectPurchaseRequest, DirectPurchaseResult, LibrarySent, SendLibraryRequest},
    error::{AppError, AppResult},
    models::{EmailStatus, PurchaseStatus},
    providers::{LibraryItem, drive::extract_file_id},
    response::{ApiResponse, Meta},
    services::{access_service::grant_book_access, notification_service},
    state::AppState,
    store::{self, NewPurchase, normalize_email},
};

/// Grant and deliver a book without a payment step.
///
/// Only reachable when direct purchases are enabled. The purchase is persisted
/// as COMPLETED so the emailed token passes the download gate.
pub async fn direct_purchase(
    state: &AppState,
    payload: DirectPurchaseRequest,
) -> AppResult<ApiResponse<DirectPurchaseResult>> {
    if !state.settings.allow_direct_purchase {
        tracing::warn!(book_id = %payload.book_id, "direct purchase attempted while disabled");
        return Err(AppError::Forbidden);
    }
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let book = store::find_book(&state.orm, &payload.book_id).await?;
    let link = book
        .drive_link
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Drive link not found".into()))?;
    let file_id =
        extract_file_id(link).ok_or_else(|| AppError::BadRequest("Invalid drive link".into()))?;

    // No purchase row unless the grant went through.
    state.drive.grant_access(&file_id, &email).await?;

    let purchase = store::create_purchase(
        &state.orm,
        NewPurchase {
            book_id: &book.id,
            email: &email,
            order_id: None,
            amount: book.price,
            currency: &state.settings.currency,
            status: PurchaseStatus::Completed,
        },
    )
    .await?;
    tracing::info!(purchase_id = %purchase.id, book_id = %book.id, "direct purchase granted");

    let token = state.tokens.issue(&email, purchase.id)?;
    let download_url = state.settings.download_url(&book.id, &token);
    let notification = notification_service::deliver_download_link(
        state,
        purchase.id,
        &email,
        &download_url,
        &book.title,
        Some(link),
    )
    .await?;

    Ok(ApiResponse::success(
        "Purchase delivered",
        DirectPurchaseResult {
            purchase_id: purchase.id,
            notification,
        },
        Some(Meta::empty()),
    ))
}

/// Re-grant access to every completed purchase for an email and mail the library.
pub async fn send_library(
    state: &AppState,
    payload: SendLibraryRequest,
) -> AppResult<ApiResponse<LibrarySent>> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let purchases = store::completed_purchases_for_email(&state.orm, &email).await?;
    if purchases.is_empty() {
        return Err(AppError::NotFound("No purchases found for this email".into()));
    }

    let purchase_ids: Vec<_> = purchases.iter().map(|(purchase, _)| purchase.id).collect();
    let mut items = Vec::with_capacity(purchases.len());
    for (_, book) in purchases {
        if !grant_book_access(state.drive.as_ref(), &book, &email).await {
            continue;
        }
        if let Some(file_link) = book.drive_link {
            items.push(LibraryItem {
                title: book.title,
                author: book.author,
                file_link,
            });
        }
    }

    let outcome =
        notification_service::deliver_library(state, &email, &purchase_ids, &items).await?;
    if outcome == EmailStatus::Failed {
        return Err(AppError::Internal(anyhow::anyhow!(
            "library email could not be sent"
        )));
    }

    let count = items.len();
    Ok(ApiResponse::success(
        format!("Sent {count} audiobook(s) to your email"),
        LibrarySent { count },
        Some(Meta::empty()),
    ))
}
