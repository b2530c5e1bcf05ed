//! Razorpay order creation and payment-callback signature checks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use utoipa::ToSchema;

use super::{ProviderError, ensure_success, http_client};

const PROVIDER: &str = "payment gateway";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Amount in the currency's smallest unit.
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

/// Order object as returned by the gateway; passed through to the checkout client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayOrder {
    pub id: String,
    #[serde(default)]
    pub entity: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub notes: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// The three fields the checkout widget hands back after a successful payment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, ProviderError>;

    /// `true` only when the callback signature was produced with the shared secret.
    fn verify_callback(&self, callback: &PaymentCallback) -> bool;
}

/// Receipt id sent with each order: `ord_<first 8 chars of book id>_<last 6 digits of the timestamp>`.
pub fn build_receipt(book_id: &str, timestamp_millis: i64) -> String {
    let prefix: String = book_id.chars().take(8).collect();
    let stamp = timestamp_millis.to_string();
    let suffix = &stamp[stamp.len().saturating_sub(6)..];
    format!("ord_{prefix}_{suffix}")
}

/// HMAC-SHA256 over `"{order_id}|{payment_id}"` with the gateway key secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: &str) -> Result<Self, ProviderError> {
        if secret.is_empty() {
            return Err(ProviderError::Config {
                provider: PROVIDER,
                message: "key secret must not be empty".into(),
            });
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        mac
    }

    /// Lowercase hex signature, as the gateway produces it.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        hex::encode(self.mac(order_id, payment_id).finalize().into_bytes())
    }

    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        // Only the canonical lowercase form is accepted.
        if signature.len() != 64
            || !signature
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        self.mac(order_id, payment_id).verify_slice(&expected).is_ok()
    }
}

pub struct RazorpayClient {
    key_id: String,
    key_secret: String,
    api_base: String,
    verifier: SignatureVerifier,
    http: reqwest::Client,
}

impl RazorpayClient {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let key_id = key_id.into();
        let key_secret = key_secret.into();
        if key_id.trim().is_empty() {
            return Err(ProviderError::Config {
                provider: PROVIDER,
                message: "key id must not be empty".into(),
            });
        }
        let verifier = SignatureVerifier::new(&key_secret)?;

        Ok(Self {
            key_id,
            key_secret,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            verifier,
            http: http_client(PROVIDER)?,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, ProviderError> {
        if request.amount <= 0 {
            return Err(ProviderError::Other {
                provider: PROVIDER,
                message: format!("order amount must be positive, got {}", request.amount),
            });
        }

        let response = self
            .http
            .post(format!("{}/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        let order: GatewayOrder = ensure_success(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        tracing::info!(order_id = %order.id, receipt = %request.receipt, "gateway order created");
        Ok(order)
    }

    fn verify_callback(&self, callback: &PaymentCallback) -> bool {
        self.verifier
            .verify(&callback.order_id, &callback.payment_id, &callback.signature)
    }
}
