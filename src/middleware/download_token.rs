use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use crate::{dto::purchases::DownloadQuery, error::AppError, state::AppState, token::DownloadClaims};

impl FromRequestParts<AppState> for DownloadClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<DownloadQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized("Missing download token".into()))?;

        let token = query
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing download token".into()))?;

        state
            .tokens
            .verify(&token)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".into()))
    }
}
