//! Google Drive adapter: per-email read grants on shared audiobook files.
//!
//! Authenticates as a service account: a short-lived RS256 assertion is
//! exchanged for an OAuth access token, which is cached until shortly before
//! it expires.

use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, TryStreamExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{ProviderError, ensure_success, http_client};

const PROVIDER: &str = "drive";
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const PAGE_SIZE: &str = "100";

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePermission {
    pub id: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl FilePermission {
    fn belongs_to(&self, email: &str) -> bool {
        self.email_address
            .as_deref()
            .is_some_and(|addr| addr.eq_ignore_ascii_case(email))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub web_content_link: Option<String>,
    /// Byte size; Drive reports it as a decimal string.
    #[serde(default)]
    pub size: Option<String>,
}

pub struct FileContent {
    pub file_name: String,
    pub mime_type: String,
    pub stream: ByteStream,
}

/// Pull the file id out of a share link.
///
/// Understands `/file/d/<id>/...` and `?id=<id>` / `&id=<id>`; the path form wins.
pub fn extract_file_id(url: &str) -> Option<String> {
    fn id_prefix(s: &str) -> Option<String> {
        let id: String = s
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        (!id.is_empty()).then_some(id)
    }

    if let Some(id) = url
        .match_indices("/file/d/")
        .find_map(|(idx, marker)| id_prefix(&url[idx + marker.len()..]))
    {
        return Some(id);
    }

    url.match_indices("id=")
        .filter(|(idx, _)| *idx > 0 && matches!(url.as_bytes()[idx - 1], b'?' | b'&'))
        .find_map(|(idx, marker)| id_prefix(&url[idx + marker.len()..]))
}

#[async_trait]
pub trait AccessProvider: Send + Sync {
    /// Give `email` read access to the file. Repeated calls return the existing grant.
    async fn grant_access(
        &self,
        file_id: &str,
        email: &str,
    ) -> Result<FilePermission, ProviderError>;

    async fn list_access(&self, file_id: &str) -> Result<Vec<FilePermission>, ProviderError>;

    /// `false` when the email held no grant on the file.
    async fn revoke_access(&self, file_id: &str, email: &str) -> Result<bool, ProviderError>;

    async fn has_access(&self, file_id: &str, email: &str) -> Result<bool, ProviderError> {
        Ok(self
            .list_access(file_id)
            .await?
            .iter()
            .any(|p| p.belongs_to(email)))
    }

    async fn list_files_in_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, ProviderError>;

    async fn fetch_content(&self, file_id: &str) -> Result<FileContent, ProviderError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct GoogleDriveClient {
    key: ServiceAccountKey,
    api_base: String,
    http: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleDriveClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self, ProviderError> {
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(ProviderError::Config {
                provider: PROVIDER,
                message: "service account key is missing client_email or private_key".into(),
            });
        }
        Ok(Self {
            key,
            api_base: DRIVE_API_BASE.to_string(),
            http: http_client(PROVIDER)?,
            token: Mutex::new(None),
        })
    }

    /// Point the client at another Drive v3 endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_service_account_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ProviderError::Config {
            provider: PROVIDER,
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let key: ServiceAccountKey =
            serde_json::from_str(&raw).map_err(|e| ProviderError::Config {
                provider: PROVIDER,
                message: format!("invalid service account file {}: {e}", path.display()),
            })?;
        Self::new(key)
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        #[derive(Serialize)]
        struct AssertionClaims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: i64,
            exp: i64,
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + Duration::from_secs(60) {
                return Ok(token.token.clone());
            }
        }

        let token_uri = self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).map_err(|e| {
            ProviderError::Credentials {
                provider: PROVIDER,
                message: e.to_string(),
            }
        })?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| ProviderError::Credentials {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let response = self
            .http
            .post(token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let issued: TokenResponse = ensure_success(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        *cached = Some(CachedToken {
            token: issued.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(issued.expires_in),
        });
        Ok(issued.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        ensure_success(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))
    }
}

#[async_trait]
impl AccessProvider for GoogleDriveClient {
    async fn grant_access(
        &self,
        file_id: &str,
        email: &str,
    ) -> Result<FilePermission, ProviderError> {
        if let Some(existing) = self
            .list_access(file_id)
            .await?
            .into_iter()
            .find(|p| p.belongs_to(email))
        {
            tracing::debug!(%file_id, %email, "access already granted");
            return Ok(existing);
        }

        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/files/{file_id}/permissions", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("sendNotificationEmail", "false"),
                ("fields", "id,emailAddress,role,type"),
            ])
            .json(&serde_json::json!({
                "type": "user",
                "role": "reader",
                "emailAddress": email,
            }))
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let permission: FilePermission = ensure_success(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        tracing::info!(%file_id, %email, permission_id = %permission.id, "access granted");
        Ok(permission)
    }

    async fn list_access(&self, file_id: &str) -> Result<Vec<FilePermission>, ProviderError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct PermissionPage {
            #[serde(default)]
            permissions: Vec<FilePermission>,
            next_page_token: Option<String>,
        }

        let url = format!("{}/files/{file_id}/permissions", self.api_base);
        let mut permissions = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("fields", "nextPageToken,permissions(id,emailAddress,role,type)"),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: PermissionPage = self.get_json(url.clone(), &query).await?;
            permissions.extend(page.permissions);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(permissions)
    }

    async fn revoke_access(&self, file_id: &str, email: &str) -> Result<bool, ProviderError> {
        let Some(permission) = self
            .list_access(file_id)
            .await?
            .into_iter()
            .find(|p| p.belongs_to(email))
        else {
            tracing::info!(%file_id, %email, "no permission to revoke");
            return Ok(false);
        };

        let token = self.access_token().await?;
        let response = self
            .http
            .delete(format!(
                "{}/files/{file_id}/permissions/{}",
                self.api_base, permission.id
            ))
            .bearer_auth(token)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        ensure_success(PROVIDER, response).await?;

        tracing::info!(%file_id, %email, "access revoked");
        Ok(true)
    }

    async fn list_files_in_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, ProviderError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct FilePage {
            #[serde(default)]
            files: Vec<DriveFile>,
            next_page_token: Option<String>,
        }

        let url = format!("{}/files", self.api_base);
        let q = format!("'{folder_id}' in parents and trashed = false");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("q", q.as_str()),
                (
                    "fields",
                    "nextPageToken,files(id,name,mimeType,webViewLink,webContentLink,size)",
                ),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: FilePage = self.get_json(url.clone(), &query).await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(files)
    }

    async fn fetch_content(&self, file_id: &str) -> Result<FileContent, ProviderError> {
        let meta: DriveFile = self
            .get_json(
                format!("{}/files/{file_id}", self.api_base),
                &[("fields", "id,name,mimeType,size")],
            )
            .await?;

        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}/files/{file_id}", self.api_base))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let response = ensure_success(PROVIDER, response).await?;

        Ok(FileContent {
            file_name: meta.name,
            mime_type: meta
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            stream: Box::pin(response.bytes_stream().map_err(std::io::Error::other)),
        })
    }
}
