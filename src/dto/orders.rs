use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{EmailStatus, PurchaseStatus};
use crate::providers::PaymentCallback;

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    /// Price in the major currency unit, as displayed in the catalog.
    #[validate(range(exclusive_min = 0.0, message = "price must be positive"))]
    pub price: f64,
}

/// Gateway callback plus the buyer fields the checkout page echoes back.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "orderId is required"))]
    pub order_id: String,
    #[validate(length(min = 1, message = "paymentId is required"))]
    pub payment_id: String,
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
    #[validate(length(min = 1, message = "bookId is required"))]
    pub book_id: String,
    pub book_title: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
}

impl VerifyPaymentRequest {
    pub fn callback(&self) -> PaymentCallback {
        PaymentCallback {
            order_id: self.order_id.clone(),
            payment_id: self.payment_id.clone(),
            signature: self.signature.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentResult {
    pub purchase_id: Uuid,
    pub status: PurchaseStatus,
    /// `Some(false)` when the shared-file grant failed and needs operator follow-up.
    pub access_granted: Option<bool>,
    /// `None` on both fields when this call repeated an already fulfilled order.
    pub notification: Option<EmailStatus>,
    pub already_completed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignatureCheck {
    pub valid: bool,
}
