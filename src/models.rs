use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use crate::entity::status::{EmailStatus, EmailType, PurchaseStatus};
use crate::entity::books;

/// Catalog entry as exposed by the API. `price` is in the major currency unit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: f64,
    pub cover_image: String,
    pub drive_link: Option<String>,
}

/// Convert a major-unit amount (e.g. `12.99`) to minor units (`1299`).
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn to_major_units(amount: i64) -> f64 {
    amount as f64 / 100.0
}

impl From<books::Model> for Book {
    fn from(model: books::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            author: model.author,
            description: model.description,
            price: to_major_units(model.price),
            cover_image: model.cover_image,
            drive_link: model.drive_link,
        }
    }
}
