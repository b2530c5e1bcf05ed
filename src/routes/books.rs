use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::books::BookList,
    error::AppResult,
    models::Book,
    response::ApiResponse,
    services::book_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_books))
        .route("/{id}", get(get_book))
}

#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "Catalog, newest first", body = ApiResponse<BookList>)
    ),
    tag = "Books"
)]
pub async fn list_books(State(state): State<AppState>) -> AppResult<Json<ApiResponse<BookList>>> {
    let resp = book_service::list_books(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/books/{id}",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Get book", body = ApiResponse<Book>),
        (status = 404, description = "Book not found"),
    ),
    tag = "Books"
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let resp = book_service::get_book(&state, &id).await?;
    Ok(Json(resp))
}
