use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    db::create_orm_conn,
    providers::{
        AccessProvider, GoogleDriveClient, Notifier, PaymentGateway, RazorpayClient,
        ResendMailer,
    },
    token::TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub tokens: TokenService,
    pub payments: Arc<dyn PaymentGateway>,
    pub drive: Arc<dyn AccessProvider>,
    pub mailer: Arc<dyn Notifier>,
    pub settings: StoreSettings,
}

/// The slice of configuration the request handlers need.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub public_base_url: String,
    pub currency: String,
    pub allow_direct_purchase: bool,
}

impl StoreSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            public_base_url: config.public_base_url.clone(),
            currency: config.payment.currency.clone(),
            allow_direct_purchase: config.allow_direct_purchase,
        }
    }

    pub fn download_url(&self, book_id: &str, token: &str) -> String {
        format!("{}/api/download/{book_id}?token={token}", self.public_base_url)
    }
}

impl AppState {
    /// Connect to the database and build the production provider clients.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let orm = create_orm_conn(&config.database_url).await?;
        let tokens = TokenService::new(&config.jwt_secret)?;
        let payments = RazorpayClient::new(
            &config.payment.key_id,
            &config.payment.key_secret,
            &config.payment.api_base,
        )?;
        let drive = GoogleDriveClient::from_service_account_file(&config.drive.service_account_path)?;
        let mailer = ResendMailer::new(&config.email.api_key, &config.email.from)?;

        Ok(Self {
            orm,
            tokens,
            payments: Arc::new(payments),
            drive: Arc::new(drive),
            mailer: Arc::new(mailer),
            settings: StoreSettings::from_config(config),
        })
    }
}
