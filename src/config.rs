use std::env;

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
    pub jwt_secret: String,
    pub payment: PaymentConfig,
    pub email: EmailConfig,
    pub drive: DriveConfig,
    pub allow_direct_purchase: bool,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_base: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub service_account_path: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let jwt_secret = required("JWT_SECRET")?;

        let payment = PaymentConfig {
            key_id: required("RAZORPAY_KEY_ID")?,
            key_secret: required("RAZORPAY_KEY_SECRET")?,
            api_base: env::var("RAZORPAY_API_BASE")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        };

        let email = EmailConfig {
            api_key: required("RESEND_API_KEY")?,
            from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Audiobook Seller <onboarding@resend.dev>".to_string()),
        };

        let drive = DriveConfig {
            service_account_path: env::var("GOOGLE_SERVICE_ACCOUNT_PATH")
                .unwrap_or_else(|_| "service-account.json".to_string()),
        };

        let allow_direct_purchase = env::var("ALLOW_DIRECT_PURCHASE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            host,
            port,
            public_base_url,
            jwt_secret,
            payment,
            email,
            drive,
            allow_direct_purchase,
        })
    }
}

// Secrets must be present and non-empty.
fn required(name: &str) -> anyhow::Result<String> {
    let value = env::var(name).with_context(|| format!("{name} is not set"))?;
    if value.trim().is_empty() {
        bail!("{name} must not be empty");
    }
    Ok(value)
}
