//! Transactional email through the Resend HTTP API.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{ProviderError, ensure_success, http_client};

const PROVIDER: &str = "email";
const RESEND_API_BASE: &str = "https://api.resend.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub title: String,
    pub author: String,
    pub file_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Returns the provider's message id on success.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_download_link(
        &self,
        email: &str,
        download_url: &str,
        title: &str,
        file_link: Option<&str>,
    ) -> Result<String, ProviderError>;

    async fn send_library(
        &self,
        email: &str,
        items: &[LibraryItem],
    ) -> Result<String, ProviderError>;
}

pub struct ResendMailer {
    api_key: String,
    from: String,
    api_base: String,
    http: reqwest::Client,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config {
                provider: PROVIDER,
                message: "api key must not be empty".into(),
            });
        }
        Ok(Self {
            api_key,
            from: from.into(),
            api_base: RESEND_API_BASE.to_string(),
            http: http_client(PROVIDER)?,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn send(&self, to: &str, rendered: RenderedEmail) -> Result<String, ProviderError> {
        #[derive(Serialize)]
        struct SendRequest<'a> {
            from: &'a str,
            to: [&'a str; 1],
            subject: &'a str,
            html: &'a str,
        }

        #[derive(Deserialize)]
        struct SendResponse {
            id: String,
        }

        let response = self
            .http
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&SendRequest {
                from: &self.from,
                to: [to],
                subject: &rendered.subject,
                html: &rendered.html,
            })
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let sent: SendResponse = ensure_success(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;

        tracing::info!(%to, message_id = %sent.id, subject = %rendered.subject, "email sent");
        Ok(sent.id)
    }
}

#[async_trait]
impl Notifier for ResendMailer {
    async fn send_download_link(
        &self,
        email: &str,
        download_url: &str,
        title: &str,
        file_link: Option<&str>,
    ) -> Result<String, ProviderError> {
        let rendered = render_download_email(email, download_url, title, file_link);
        self.send(email, rendered).await
    }

    async fn send_library(
        &self,
        email: &str,
        items: &[LibraryItem],
    ) -> Result<String, ProviderError> {
        let rendered = render_library_email(items);
        self.send(email, rendered).await
    }
}

pub fn render_download_email(
    email: &str,
    download_url: &str,
    title: &str,
    file_link: Option<&str>,
) -> RenderedEmail {
    let access_link = file_link.unwrap_or(download_url);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #059669; font-weight: 300;">Your Audiobook is Ready!</h1>
  <h2 style="color: #059669;">{title}</h2>
  <p>Thank you for your purchase!</p>
  <p><a href="{access_link}" style="display: inline-block; padding: 14px 36px; background: #10b981; color: white; text-decoration: none; border-radius: 50px;">Access Your Audiobook</a></p>
  <p style="font-size: 14px;">Prefer a copy? <a href="{download_url}">Download it once</a> (link valid for 24 hours).</p>
  <p style="font-size: 13px; color: #9ca3af;">Having trouble accessing your audiobook? Make sure you're signed in to Google with <strong>{email}</strong>.</p>
  {footer}
</body>
</html>"#,
        title = escape_html(title),
        access_link = escape_html(access_link),
        download_url = escape_html(download_url),
        email = escape_html(email),
        footer = footer(),
    );

    RenderedEmail {
        subject: format!("Your Audiobook: {title}"),
        html,
    }
}

pub fn render_library_email(items: &[LibraryItem]) -> RenderedEmail {
    let count = items.len();
    let noun = if count == 1 { "Book" } else { "Books" };
    let entries: String = items
        .iter()
        .map(|item| {
            format!(
                r#"  <div style="margin-bottom: 20px; padding: 20px; background: #f0fdf4; border-left: 4px solid #10b981;">
    <h3 style="margin: 0 0 8px 0; color: #047857;">{title}</h3>
    <p style="margin: 0 0 15px 0; color: #6b7280;">by {author}</p>
    <a href="{link}" style="color: #059669;">Access your audiobook</a>
  </div>
"#,
                title = escape_html(&item.title),
                author = escape_html(&item.author),
                link = escape_html(&item.file_link),
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #059669; font-weight: 300;">Your Audiobook Library</h1>
  <p>Welcome back! Here {verb} all {count} audiobook{plural} you've purchased.</p>
{entries}  {footer}
</body>
</html>"#,
        verb = if count == 1 { "is" } else { "are" },
        plural = if count == 1 { "" } else { "s" },
        footer = footer(),
    );

    RenderedEmail {
        subject: format!("Your Audiobook Library ({count} {noun})"),
        html,
    }
}

fn footer() -> String {
    format!(
        r#"<p style="text-align: center; color: #9ca3af; font-size: 12px;">&copy; {} Audiobook Seller. All rights reserved.</p>"#,
        Utc::now().year()
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
