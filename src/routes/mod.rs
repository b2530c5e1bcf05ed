use axum::Router;

use crate::state::AppState;

pub mod books;
pub mod doc;
pub mod download;
pub mod health;
pub mod orders;
pub mod purchases;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/books", books::router())
        .nest("/download", download::router())
        .merge(orders::router())
        .merge(purchases::router())
}
