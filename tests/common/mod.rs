#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use audiobook_store::{
    db::create_schema_from_entities,
    dto::orders::{CreateOrderRequest, VerifyPaymentRequest},
    entity::books,
    providers::{
        AccessProvider, DriveFile, FileContent, FilePermission, GatewayOrder, LibraryItem,
        Notifier, OrderRequest, PaymentCallback, PaymentGateway, SignatureVerifier,
        ProviderError,
    },
    services::order_service,
    state::{AppState, StoreSettings},
    token::TokenService,
};
use bytes::Bytes;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};

pub const GATEWAY_SECRET: &str = "test_gateway_secret";
pub const JWT_SECRET: &str = "test_jwt_secret";
pub const BOOK_ID: &str = "B1";
pub const BUYER: &str = "a@x.com";
pub const FILE_ID: &str = "ABC123";
pub const CONTENT: &[u8] = b"ID3-audiobook-bytes";

pub struct FakeGateway {
    pub verifier: SignatureVerifier,
    pub orders: Mutex<Vec<OrderRequest>>,
    next_id: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            verifier: SignatureVerifier::new(GATEWAY_SECRET).expect("verifier"),
            orders: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        self.verifier.sign(order_id, payment_id)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, ProviderError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.orders.lock().unwrap().push(request.clone());
        Ok(GatewayOrder {
            id: format!("order_{n}"),
            entity: Some("order".into()),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".into()),
            notes: serde_json::to_value(&request.notes).unwrap_or_default(),
            created_at: Some(Utc::now().timestamp()),
        })
    }

    fn verify_callback(&self, callback: &PaymentCallback) -> bool {
        self.verifier
            .verify(&callback.order_id, &callback.payment_id, &callback.signature)
    }
}

#[derive(Default)]
pub struct FakeDrive {
    pub fail_grants: AtomicBool,
    pub fail_fetch: AtomicBool,
    pub grants: Mutex<Vec<(String, String)>>,
    pub fetches: AtomicUsize,
}

impl FakeDrive {
    fn failure(message: &str) -> ProviderError {
        ProviderError::Other {
            provider: "drive",
            message: message.into(),
        }
    }
}

#[async_trait]
impl AccessProvider for FakeDrive {
    async fn grant_access(
        &self,
        file_id: &str,
        email: &str,
    ) -> Result<FilePermission, ProviderError> {
        if self.fail_grants.load(Ordering::SeqCst) {
            return Err(Self::failure("permission denied"));
        }
        self.grants
            .lock()
            .unwrap()
            .push((file_id.to_string(), email.to_string()));
        Ok(FilePermission {
            id: format!("perm-{email}"),
            email_address: Some(email.to_string()),
            role: Some("reader".into()),
            kind: Some("user".into()),
        })
    }

    async fn list_access(&self, file_id: &str) -> Result<Vec<FilePermission>, ProviderError> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == file_id)
            .map(|(_, email)| FilePermission {
                id: format!("perm-{email}"),
                email_address: Some(email.clone()),
                role: Some("reader".into()),
                kind: Some("user".into()),
            })
            .collect())
    }

    async fn revoke_access(&self, file_id: &str, email: &str) -> Result<bool, ProviderError> {
        let mut grants = self.grants.lock().unwrap();
        let before = grants.len();
        grants.retain(|(id, e)| !(id == file_id && e == email));
        Ok(grants.len() != before)
    }

    async fn list_files_in_folder(&self, _folder_id: &str) -> Result<Vec<DriveFile>, ProviderError> {
        Ok(Vec::new())
    }

    async fn fetch_content(&self, file_id: &str) -> Result<FileContent, ProviderError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::failure("file unavailable"));
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(&CONTENT[..4])),
            Ok(Bytes::from_static(&CONTENT[4..])),
        ];
        Ok(FileContent {
            file_name: format!("{file_id}.mp3"),
            mime_type: "audio/mpeg".into(),
            stream: Box::pin(futures::stream::iter(chunks)),
        })
    }
}

#[derive(Debug, Clone)]
pub enum SentMail {
    DownloadLink {
        email: String,
        download_url: String,
        title: String,
    },
    Library {
        email: String,
        items: Vec<LibraryItem>,
    },
}

#[derive(Default)]
pub struct FakeMailer {
    pub fail: AtomicBool,
    pub attempts: AtomicUsize,
    pub sent: Mutex<Vec<SentMail>>,
}

impl FakeMailer {
    fn attempt(&self, mail: SentMail) -> Result<String, ProviderError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Status {
                provider: "email",
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(mail);
        Ok(format!("msg_{n}"))
    }

    pub fn last_download_url(&self) -> Option<String> {
        self.sent.lock().unwrap().iter().rev().find_map(|mail| match mail {
            SentMail::DownloadLink { download_url, .. } => Some(download_url.clone()),
            SentMail::Library { .. } => None,
        })
    }
}

#[async_trait]
impl Notifier for FakeMailer {
    async fn send_download_link(
        &self,
        email: &str,
        download_url: &str,
        title: &str,
        _file_link: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.attempt(SentMail::DownloadLink {
            email: email.to_string(),
            download_url: download_url.to_string(),
            title: title.to_string(),
        })
    }

    async fn send_library(
        &self,
        email: &str,
        items: &[LibraryItem],
    ) -> Result<String, ProviderError> {
        self.attempt(SentMail::Library {
            email: email.to_string(),
            items: items.to_vec(),
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub drive: Arc<FakeDrive>,
    pub mailer: Arc<FakeMailer>,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_direct_purchase(false).await
    }

    pub async fn with_direct_purchase(allow_direct_purchase: bool) -> anyhow::Result<Self> {
        // A single connection keeps the in-memory database alive and shared.
        Self::build("sqlite::memory:", 1, allow_direct_purchase).await
    }

    /// An app over a database file, so several pooled connections can race.
    pub async fn with_database_file(path: &Path, connections: u32) -> anyhow::Result<Self> {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        Self::build(&url, connections, false).await
    }

    async fn build(
        url: &str,
        connections: u32,
        allow_direct_purchase: bool,
    ) -> anyhow::Result<Self> {
        let mut options = ConnectOptions::new(url);
        options
            .max_connections(connections)
            .min_connections(1)
            .sqlx_logging(false);
        let orm = Database::connect(options).await?;
        create_schema_from_entities(&orm).await?;

        let gateway = Arc::new(FakeGateway::new());
        let drive = Arc::new(FakeDrive::default());
        let mailer = Arc::new(FakeMailer::default());

        let state = AppState {
            orm,
            tokens: TokenService::new(JWT_SECRET)?,
            payments: gateway.clone(),
            drive: drive.clone(),
            mailer: mailer.clone(),
            settings: StoreSettings {
                public_base_url: "http://store.test".into(),
                currency: "INR".into(),
                allow_direct_purchase,
            },
        };

        let app = Self {
            state,
            gateway,
            drive,
            mailer,
        };
        app.insert_book(BOOK_ID, "The Art of War", 10_000, Some(&drive_link(FILE_ID)))
            .await?;
        Ok(app)
    }

    pub async fn insert_book(
        &self,
        id: &str,
        title: &str,
        price: i64,
        drive_link: Option<&str>,
    ) -> anyhow::Result<books::Model> {
        let book = books::ActiveModel {
            id: Set(id.to_string()),
            title: Set(title.to_string()),
            author: Set("Sun Tzu".into()),
            description: Set("Strategy".into()),
            price: Set(price),
            cover_image: Set("https://img.test/cover.jpg".into()),
            drive_link: Set(drive_link.map(str::to_string)),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.state.orm)
        .await?;
        Ok(book)
    }

    /// Place an order for `book_id` at `price` (major units) and return the gateway order id.
    pub async fn place_order(
        &self,
        book_id: &str,
        email: &str,
        price: f64,
    ) -> anyhow::Result<String> {
        let resp = order_service::create_order(
            &self.state,
            CreateOrderRequest {
                book_id: book_id.into(),
                email: email.into(),
                price,
            },
        )
        .await?;
        Ok(resp.data.expect("order").id)
    }

    /// A correctly signed verify request for a placed order.
    pub fn signed_verify(
        &self,
        order_id: &str,
        payment_id: &str,
        book_id: &str,
        email: &str,
    ) -> VerifyPaymentRequest {
        VerifyPaymentRequest {
            order_id: order_id.into(),
            payment_id: payment_id.into(),
            signature: self.gateway.sign(order_id, payment_id),
            book_id: book_id.into(),
            book_title: "The Art of War".into(),
            email: email.into(),
        }
    }

    /// Order and pay for the default book; returns the download URL that was mailed.
    pub async fn buy_default_book(&self) -> anyhow::Result<String> {
        let order_id = self.place_order(BOOK_ID, BUYER, 100.0).await?;
        let request = self.signed_verify(&order_id, "pay_1", BOOK_ID, BUYER);
        order_service::verify_payment(&self.state, request).await?;
        Ok(self.mailer.last_download_url().expect("download link mailed"))
    }
}

pub fn drive_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view?usp=drive_link")
}

/// The `token` query value of a mailed download URL.
pub fn token_from_url(url: &str) -> String {
    url.split_once("token=")
        .map(|(_, token)| token.to_string())
        .expect("token in download url")
}
