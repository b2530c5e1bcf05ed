//! Catalog, purchase and notification-record persistence.
//!
//! State transitions that must not race (completing a purchase, consuming the
//! download allowance, finishing a notification record) are single conditional
//! `UPDATE`s; callers look at the affected row count instead of reading first.

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    entity::{
        books::{self, Entity as Books},
        emails::{self, Entity as Emails},
        purchases::{self, Entity as Purchases},
    },
    error::{AppError, AppResult},
    models::{EmailStatus, EmailType, PurchaseStatus},
};

/// Downloads allowed per completed purchase.
pub const DOWNLOAD_LIMIT: i32 = 1;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub async fn list_books<C: ConnectionTrait>(db: &C) -> AppResult<Vec<books::Model>> {
    Ok(Books::find()
        .order_by_desc(books::Column::CreatedAt)
        .order_by_asc(books::Column::Id)
        .all(db)
        .await?)
}

pub async fn find_book<C: ConnectionTrait>(db: &C, id: &str) -> AppResult<books::Model> {
    Books::find_by_id(id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".into()))
}

pub struct NewPurchase<'a> {
    pub book_id: &'a str,
    pub email: &'a str,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: &'a str,
    pub status: PurchaseStatus,
}

pub async fn create_purchase<C: ConnectionTrait>(
    db: &C,
    new: NewPurchase<'_>,
) -> AppResult<purchases::Model> {
    let now = Utc::now();
    let purchase = purchases::ActiveModel {
        id: Set(Uuid::new_v4()),
        book_id: Set(new.book_id.to_string()),
        email: Set(normalize_email(new.email)),
        order_id: Set(new.order_id),
        payment_id: Set(None),
        amount: Set(new.amount),
        currency: Set(new.currency.to_string()),
        status: Set(new.status),
        download_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    Ok(purchase)
}

pub async fn find_purchase_by_order<C: ConnectionTrait>(
    db: &C,
    order_id: &str,
) -> AppResult<Option<purchases::Model>> {
    Ok(Purchases::find()
        .filter(purchases::Column::OrderId.eq(order_id))
        .one(db)
        .await?)
}

/// PENDING -> COMPLETED. Returns `false` if the purchase was not pending.
pub async fn complete_purchase<C: ConnectionTrait>(
    db: &C,
    purchase_id: Uuid,
    payment_id: &str,
) -> AppResult<bool> {
    let result = Purchases::update_many()
        .set(purchases::ActiveModel {
            status: Set(PurchaseStatus::Completed),
            payment_id: Set(Some(payment_id.to_string())),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .filter(purchases::Column::Id.eq(purchase_id))
        .filter(purchases::Column::Status.eq(PurchaseStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

pub async fn find_completed_purchase<C: ConnectionTrait>(
    db: &C,
    purchase_id: Uuid,
    email: &str,
) -> AppResult<Option<purchases::Model>> {
    Ok(Purchases::find()
        .filter(purchases::Column::Id.eq(purchase_id))
        .filter(purchases::Column::Email.eq(normalize_email(email)))
        .filter(purchases::Column::Status.eq(PurchaseStatus::Completed))
        .one(db)
        .await?)
}

/// Completed purchases for an email, newest first, each with its book.
pub async fn completed_purchases_for_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> AppResult<Vec<(purchases::Model, books::Model)>> {
    let rows = Purchases::find()
        .find_also_related(Books)
        .filter(purchases::Column::Email.eq(normalize_email(email)))
        .filter(purchases::Column::Status.eq(PurchaseStatus::Completed))
        .order_by_desc(purchases::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(purchase, book)| book.map(|book| (purchase, book)))
        .collect())
}

/// Take one download from the allowance; `false` once the limit is reached.
pub async fn claim_download<C: ConnectionTrait>(db: &C, purchase_id: Uuid) -> AppResult<bool> {
    let result = Purchases::update_many()
        .col_expr(
            purchases::Column::DownloadCount,
            Expr::col(purchases::Column::DownloadCount).add(1),
        )
        .filter(purchases::Column::Id.eq(purchase_id))
        .filter(purchases::Column::Status.eq(PurchaseStatus::Completed))
        .filter(purchases::Column::DownloadCount.lt(DOWNLOAD_LIMIT))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Give back a claimed download when the content could not be delivered.
pub async fn release_download<C: ConnectionTrait>(db: &C, purchase_id: Uuid) -> AppResult<()> {
    Purchases::update_many()
        .col_expr(
            purchases::Column::DownloadCount,
            Expr::col(purchases::Column::DownloadCount).sub(1),
        )
        .filter(purchases::Column::Id.eq(purchase_id))
        .filter(purchases::Column::DownloadCount.gt(0))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn create_email_record<C: ConnectionTrait>(
    db: &C,
    purchase_id: Uuid,
    email_type: EmailType,
) -> AppResult<emails::Model> {
    let record = emails::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_id: Set(purchase_id),
        email_type: Set(email_type),
        status: Set(EmailStatus::Pending),
        sent_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(record)
}

/// PENDING -> SENT|FAILED. A record that already left PENDING is left untouched.
pub async fn finish_email_record<C: ConnectionTrait>(
    db: &C,
    record_id: Uuid,
    outcome: EmailStatus,
) -> AppResult<bool> {
    if outcome == EmailStatus::Pending {
        return Err(AppError::Internal(anyhow::anyhow!(
            "notification record can only move out of PENDING"
        )));
    }

    let sent_at: Option<DateTimeWithTimeZone> =
        (outcome == EmailStatus::Sent).then(|| Utc::now().into());
    let result = Emails::update_many()
        .set(emails::ActiveModel {
            status: Set(outcome),
            sent_at: Set(sent_at),
            ..Default::default()
        })
        .filter(emails::Column::Id.eq(record_id))
        .filter(emails::Column::Status.eq(EmailStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

pub async fn email_records_for_purchase<C: ConnectionTrait>(
    db: &C,
    purchase_id: Uuid,
) -> AppResult<Vec<emails::Model>> {
    Ok(Emails::find()
        .filter(emails::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(emails::Column::CreatedAt)
        .all(db)
        .await?)
}
