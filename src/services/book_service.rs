use crate::{
    dto::books::BookList,
    error::AppResult,
    models::Book,
    response::{ApiResponse, Meta},
    state::AppState,
    store,
};

pub async fn list_books(state: &AppState) -> AppResult<ApiResponse<BookList>> {
    let items: Vec<Book> = store::list_books(&state.orm)
        .await?
        .into_iter()
        .map(Book::from)
        .collect();

    let total = items.len() as i64;
    let meta = Meta::new(1, total, total);
    Ok(ApiResponse::success("Books", BookList { items }, Some(meta)))
}

pub async fn get_book(state: &AppState, id: &str) -> AppResult<ApiResponse<Book>> {
    let book = store::find_book(&state.orm, id).await?;
    Ok(ApiResponse::success("Book", Book::from(book), None))
}
