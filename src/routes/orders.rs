use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::orders::{CreateOrderRequest, FulfillmentResult, SignatureCheck, VerifyPaymentRequest},
    error::AppResult,
    middleware::json_body::JsonBody,
    providers::{GatewayOrder, PaymentCallback},
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/verify-payment", post(verify_payment))
        .route("/purchase/verify", post(verify_signature))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Gateway order created", body = ApiResponse<GatewayOrder>),
        (status = 400, description = "Validation error or price mismatch"),
        (status = 404, description = "Book not found"),
        (status = 500, description = "Payment gateway failure"),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<GatewayOrder>>> {
    let resp = order_service::create_order(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/verify-payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified and purchase fulfilled", body = ApiResponse<FulfillmentResult>),
        (status = 400, description = "Invalid signature or mismatched purchase"),
        (status = 404, description = "Unknown order"),
    ),
    tag = "Orders"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<VerifyPaymentRequest>,
) -> AppResult<Json<ApiResponse<FulfillmentResult>>> {
    let resp = order_service::verify_payment(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/purchase/verify",
    request_body = PaymentCallback,
    responses(
        (status = 200, description = "Signature is valid", body = ApiResponse<SignatureCheck>),
        (status = 400, description = "Invalid signature"),
    ),
    tag = "Orders"
)]
pub async fn verify_signature(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<PaymentCallback>,
) -> AppResult<Json<ApiResponse<SignatureCheck>>> {
    let resp = order_service::check_signature(&state, payload)?;
    Ok(Json(resp))
}
