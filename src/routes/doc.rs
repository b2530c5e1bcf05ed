use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        books::BookList,
        orders::{CreateOrderRequest, FulfillmentResult, SignatureCheck, VerifyPaymentRequest},
        purchases::{DirectPurchaseRequest, DirectPurchaseResult, LibrarySent, SendLibraryRequest},
    },
    models::{Book, EmailStatus, EmailType, PurchaseStatus},
    providers::{GatewayOrder, PaymentCallback},
    response::{ApiResponse, ErrorData, Meta},
    routes::{books, download, health, orders, purchases},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        books::list_books,
        books::get_book,
        orders::create_order,
        orders::verify_payment,
        orders::verify_signature,
        purchases::direct_purchase,
        purchases::send_library,
        download::download
    ),
    components(
        schemas(
            Book,
            PurchaseStatus,
            EmailType,
            EmailStatus,
            BookList,
            CreateOrderRequest,
            VerifyPaymentRequest,
            FulfillmentResult,
            SignatureCheck,
            DirectPurchaseRequest,
            DirectPurchaseResult,
            SendLibraryRequest,
            LibrarySent,
            GatewayOrder,
            PaymentCallback,
            Meta,
            ErrorData,
            ApiResponse<Book>,
            ApiResponse<BookList>,
            ApiResponse<GatewayOrder>,
            ApiResponse<FulfillmentResult>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Books", description = "Catalog endpoints"),
        (name = "Orders", description = "Payment and fulfillment endpoints"),
        (name = "Purchases", description = "Direct purchase and library re-send"),
        (name = "Download", description = "Token-gated downloads"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
