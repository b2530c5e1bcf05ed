use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    providers::ProviderError,
    response::ApiResponse,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("{} request failed", .0.provider())]
    Provider(#[from] ProviderError),

    #[error("Database error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Provider(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Provider(err) => tracing::error!(error = %err, "provider failure"),
            AppError::OrmError(err) => tracing::error!(error = %err, "database failure"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal failure"),
            _ => {}
        }

        (status, axum::Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
