use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Book;

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct BookList {
    #[schema(value_type = Vec<Book>)]
    pub items: Vec<Book>,
}
