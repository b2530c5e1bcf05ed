use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    error::{AppError, AppResult},
    services::download_service,
    state::AppState,
    token::DownloadClaims,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(download))
}

#[utoipa::path(
    get,
    path = "/api/download/{id}",
    params(
        ("id" = String, Path, description = "Book ID"),
        ("token" = String, Query, description = "Download token from the purchase email"),
    ),
    responses(
        (status = 200, description = "File content", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "Purchase not found or download limit exceeded"),
    ),
    tag = "Download"
)]
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    claims: DownloadClaims,
) -> AppResult<Response> {
    let content = download_service::open_download(&state, &claims, &id).await?;

    let content_type = HeaderValue::from_str(&content.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        attachment_name(&content.file_name)
    ))
    .map_err(|err| AppError::Internal(err.into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(content.stream),
    )
        .into_response())
}

/// File name safe to place inside a quoted header parameter.
fn attachment_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.trim().is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}
