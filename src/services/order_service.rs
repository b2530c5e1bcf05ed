//! Paid purchase flow: gateway order creation, then fulfillment on a verified
//! payment callback.
//!
//! Fulfillment walks `OrderCreated -> PaymentVerified -> AccessGranted -> Notified`.
//! Only the signature check can stop it; a failed access grant or email is
//! logged (and recorded for the email) and the workflow still reaches its end.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use sea_orm::TransactionTrait;
use validator::Validate;

use crate::{
    dto::orders::{CreateOrderRequest, FulfillmentResult, SignatureCheck, VerifyPaymentRequest},
    error::{AppError, AppResult},
    models::{EmailType, PurchaseStatus, to_minor_units},
    providers::{GatewayOrder, OrderRequest, PaymentCallback, payment::build_receipt},
    response::{ApiResponse, Meta},
    services::{access_service::grant_book_access, notification_service::deliver_download_link},
    state::AppState,
    store::{self, NewPurchase, normalize_email},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStage {
    OrderCreated,
    PaymentVerified,
    AccessGranted,
    Notified,
}

impl fmt::Display for FulfillmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FulfillmentStage::OrderCreated => "ORDER_CREATED",
            FulfillmentStage::PaymentVerified => "PAYMENT_VERIFIED",
            FulfillmentStage::AccessGranted => "ACCESS_GRANTED",
            FulfillmentStage::Notified => "NOTIFIED",
        };
        f.write_str(name)
    }
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<GatewayOrder>> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let book = store::find_book(&state.orm, &payload.book_id).await?;
    let amount = to_minor_units(payload.price);
    if amount != book.price {
        return Err(AppError::BadRequest(
            "Price does not match catalog price".into(),
        ));
    }

    let currency = state.settings.currency.clone();
    let request = OrderRequest {
        amount,
        currency: currency.clone(),
        receipt: build_receipt(&book.id, Utc::now().timestamp_millis()),
        notes: BTreeMap::from([
            ("bookId".to_string(), book.id.clone()),
            ("email".to_string(), email.clone()),
        ]),
    };
    let order = state.payments.create_order(&request).await?;

    let txn = state.orm.begin().await?;
    let purchase = store::create_purchase(
        &txn,
        NewPurchase {
            book_id: &book.id,
            email: &email,
            order_id: Some(order.id.clone()),
            amount,
            currency: &currency,
            status: PurchaseStatus::Pending,
        },
    )
    .await?;
    // Kept as an audit entry; nothing sends the confirmation itself.
    store::create_email_record(&txn, purchase.id, EmailType::PurchaseConfirmation).await?;
    txn.commit().await?;

    tracing::info!(
        stage = %FulfillmentStage::OrderCreated,
        purchase_id = %purchase.id,
        order_id = %order.id,
        book_id = %book.id,
        amount,
        "order created"
    );

    Ok(ApiResponse::success("Order created", order, Some(Meta::empty())))
}

pub async fn verify_payment(
    state: &AppState,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<FulfillmentResult>> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    if !state.payments.verify_callback(&payload.callback()) {
        tracing::warn!(order_id = %payload.order_id, "payment signature mismatch");
        return Err(AppError::BadRequest("Invalid payment signature".into()));
    }

    let purchase = store::find_purchase_by_order(&state.orm, &payload.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase not found".into()))?;
    if purchase.book_id != payload.book_id || purchase.email != email {
        tracing::warn!(
            purchase_id = %purchase.id,
            order_id = %payload.order_id,
            "payment callback does not match the stored purchase"
        );
        return Err(AppError::BadRequest(
            "Payment does not match purchase".into(),
        ));
    }

    if !store::complete_purchase(&state.orm, purchase.id, &payload.payment_id).await? {
        // Either fulfilled earlier or concurrently; look at the row as it is now.
        let current = store::find_purchase_by_order(&state.orm, &payload.order_id)
            .await?
            .map(|p| p.status);
        if current != Some(PurchaseStatus::Completed) {
            return Err(AppError::BadRequest("Purchase cannot be completed".into()));
        }
        tracing::info!(purchase_id = %purchase.id, "payment already verified");
        return Ok(ApiResponse::success(
            "Payment already verified",
            FulfillmentResult {
                purchase_id: purchase.id,
                status: PurchaseStatus::Completed,
                access_granted: None,
                notification: None,
                already_completed: true,
            },
            Some(Meta::empty()),
        ));
    }
    tracing::info!(
        stage = %FulfillmentStage::PaymentVerified,
        purchase_id = %purchase.id,
        payment_id = %payload.payment_id,
        "purchase completed"
    );

    let book = store::find_book(&state.orm, &purchase.book_id).await?;
    let access_granted = grant_book_access(state.drive.as_ref(), &book, &email).await;
    tracing::info!(
        stage = %FulfillmentStage::AccessGranted,
        purchase_id = %purchase.id,
        access_granted,
        "access step finished"
    );

    let token = state.tokens.issue(&email, purchase.id)?;
    let download_url = state.settings.download_url(&book.id, &token);
    let notification = deliver_download_link(
        state,
        purchase.id,
        &email,
        &download_url,
        &book.title,
        book.drive_link.as_deref(),
    )
    .await?;
    tracing::info!(
        stage = %FulfillmentStage::Notified,
        purchase_id = %purchase.id,
        notification = ?notification,
        "fulfillment finished"
    );

    Ok(ApiResponse::success(
        "Payment verified",
        FulfillmentResult {
            purchase_id: purchase.id,
            status: PurchaseStatus::Completed,
            access_granted: Some(access_granted),
            notification: Some(notification),
            already_completed: false,
        },
        Some(Meta::empty()),
    ))
}

/// Signature-only check of a gateway callback; touches no state.
pub fn check_signature(
    state: &AppState,
    callback: PaymentCallback,
) -> AppResult<ApiResponse<SignatureCheck>> {
    if !state.payments.verify_callback(&callback) {
        return Err(AppError::BadRequest("Invalid payment signature".into()));
    }
    Ok(ApiResponse::success(
        "Signature valid",
        SignatureCheck { valid: true },
        Some(Meta::empty()),
    ))
}
