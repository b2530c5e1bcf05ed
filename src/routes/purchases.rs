use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::purchases::{DirectPurchaseRequest, DirectPurchaseResult, LibrarySent, SendLibraryRequest},
    error::AppResult,
    middleware::json_body::JsonBody,
    response::ApiResponse,
    services::purchase_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/purchase", post(direct_purchase))
        .route("/purchases/send", post(send_library))
}

#[utoipa::path(
    post,
    path = "/api/purchase",
    request_body = DirectPurchaseRequest,
    responses(
        (status = 200, description = "Access granted and link sent", body = ApiResponse<DirectPurchaseResult>),
        (status = 400, description = "Validation error or invalid drive link"),
        (status = 403, description = "Direct purchases are disabled"),
        (status = 404, description = "Book or drive link not found"),
    ),
    tag = "Purchases"
)]
pub async fn direct_purchase(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<DirectPurchaseRequest>,
) -> AppResult<Json<ApiResponse<DirectPurchaseResult>>> {
    let resp = purchase_service::direct_purchase(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/purchases/send",
    request_body = SendLibraryRequest,
    responses(
        (status = 200, description = "Library email sent", body = ApiResponse<LibrarySent>),
        (status = 404, description = "No completed purchases for this email"),
    ),
    tag = "Purchases"
)]
pub async fn send_library(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendLibraryRequest>,
) -> AppResult<Json<ApiResponse<LibrarySent>>> {
    let resp = purchase_service::send_library(&state, payload).await?;
    Ok(Json(resp))
}
