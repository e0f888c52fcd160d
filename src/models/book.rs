//! Book and copy (physical item) models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::CopyStatus;

/// Catalog entry as seen by the circulation core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    /// Purchase price, basis of the replacement fee
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub borrow_count: i64,
}

/// A physical copy, addressed by `(book_id, copy_id)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub book_id: i32,
    /// Unique within the book
    pub copy_id: i32,
    pub location: Option<String>,
    pub status: CopyStatus,
}

/// Add copy request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCopy {
    #[validate(length(min = 1, max = 255, message = "Location is required"))]
    pub location: String,
    /// Defaults to Available
    pub status: Option<CopyStatus>,
}

/// Update copy request; lifecycle statuses (Reserved/Borrowed) are rejected
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCopy {
    pub status: Option<CopyStatus>,
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
}
