//! Adapters for the external systems the storefront talks to.
//!
//! Each adapter sits behind an async trait so the services can be exercised
//! against in-process fakes.

pub mod drive;
pub mod mailer;
pub mod payment;

use thiserror::Error;

pub use drive::{AccessProvider, DriveFile, FileContent, FilePermission, GoogleDriveClient};
pub use mailer::{LibraryItem, Notifier, ResendMailer};
pub use payment::{
    GatewayOrder, OrderRequest, PaymentCallback, PaymentGateway, RazorpayClient,
    SignatureVerifier,
};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is misconfigured: {message}")]
    Config {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} transport error: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} credential error: {message}")]
    Credentials {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: {message}")]
    Other {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::Config { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Credentials { provider, .. }
            | ProviderError::Other { provider, .. } => provider,
        }
    }

    pub(crate) fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ProviderError::Transport { provider, source }
    }
}

/// Turn a non-2xx response into [`ProviderError::Status`], keeping the body for the logs.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read response body".to_string());
    Err(ProviderError::Status {
        provider,
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn http_client(provider: &'static str) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(15))
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(ProviderError::transport(provider))
}
