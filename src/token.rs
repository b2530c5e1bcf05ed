//! Signed, time-limited download tokens.
//!
//! A token binds a buyer email to a purchase id and expires 24 hours after
//! issuance. Tokens are never stored: every use re-verifies the signature, and
//! the download counter on the purchase is what actually limits access.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadClaims {
    pub email: String,
    pub purchase_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str) -> AppResult<Self> {
        if secret.trim().is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "token signing secret is empty"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn issue(&self, email: &str, purchase_id: Uuid) -> AppResult<String> {
        self.issue_at(email, purchase_id, Utc::now())
    }

    /// Issue a token as if it had been minted at `issued_at`.
    pub fn issue_at(
        &self,
        email: &str,
        purchase_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let expiration = issued_at
            .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = DownloadClaims {
            email: email.to_string(),
            purchase_id,
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Returns `None` for malformed, tampered or expired tokens.
    pub fn verify(&self, token: &str) -> Option<DownloadClaims> {
        match decode::<DownloadClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                tracing::debug!(error = %err, "download token rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-signing-secret").unwrap()
    }

    #[test]
    fn verify_returns_issued_claims() {
        let tokens = service();
        let purchase_id = Uuid::new_v4();
        let token = tokens.issue("a@x.com", purchase_id).unwrap();

        let claims = tokens.verify(&token).expect("valid token");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.purchase_id, purchase_id);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let issued_at = Utc::now() - Duration::hours(TOKEN_TTL_HOURS + 1);
        let token = tokens
            .issue_at("a@x.com", Uuid::new_v4(), issued_at)
            .unwrap();

        assert!(tokens.verify(&token).is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let tokens = service();
        let token = tokens.issue("a@x.com", Uuid::new_v4()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut payload = parts[1].clone().into_bytes();
        let mid = payload.len() / 2;
        payload[mid] = if payload[mid] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();

        assert!(tokens.verify(&parts.join(".")).is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenService::new("another-secret").unwrap();
        let token = other.issue("a@x.com", Uuid::new_v4()).unwrap();

        assert!(service().verify(&token).is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = service();
        assert!(tokens.verify("").is_none());
        assert!(tokens.verify("not-a-token").is_none());
        assert!(tokens.verify("a.b.c").is_none());
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        assert!(TokenService::new("").is_err());
        assert!(TokenService::new("   ").is_err());
    }
}
