use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

/// Payload of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorData {
    pub error: String,
}

impl ApiResponse<ErrorData> {
    /// Error envelope: the message is repeated under `data.error` for clients
    /// that only look at the payload.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            data: Some(ErrorData {
                error: message.clone(),
            }),
            message,
            meta: Some(Meta::empty()),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}
