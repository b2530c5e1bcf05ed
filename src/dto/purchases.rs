use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::EmailStatus;

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DirectPurchaseRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
    pub book_title: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectPurchaseResult {
    pub purchase_id: Uuid,
    pub notification: EmailStatus,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SendLibraryRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LibrarySent {
    pub count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DownloadQuery {
    pub token: Option<String>,
}
