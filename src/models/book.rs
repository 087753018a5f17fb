//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppResult;

/// 10 to 13 digits or hyphens
static ISBN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9-]{10,13}$").expect("ISBN pattern is a valid regex"));

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    /// Number of copies owned by the library
    pub quantity: i32,
    /// Number of copies not currently on loan
    pub available: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create / update book request.
///
/// Every field is optional at the wire level so that a missing field is
/// reported as a validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(
        required(message = "Missing required field: title"),
        custom(function = "crate::models::not_blank", message = "Missing required field: title"),
        length(max = 255, message = "Field too long: title (max 255 characters)")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Missing required field: author"),
        custom(function = "crate::models::not_blank", message = "Missing required field: author"),
        length(max = 255, message = "Field too long: author (max 255 characters)")
    )]
    pub author: Option<String>,
    #[validate(
        required(message = "Missing required field: isbn"),
        regex(path = *ISBN_PATTERN, message = "Invalid ISBN format")
    )]
    pub isbn: Option<String>,
    #[validate(
        required(message = "Missing required field: category"),
        custom(function = "crate::models::not_blank", message = "Missing required field: category"),
        length(max = 100, message = "Field too long: category (max 100 characters)")
    )]
    pub category: Option<String>,
    #[validate(
        required(message = "Missing required field: quantity"),
        range(min = 0, message = "Invalid quantity value")
    )]
    pub quantity: Option<i32>,
}

/// Validated book fields, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category: String,
    pub quantity: i32,
}

impl BookInput {
    /// Validate the request and extract the book fields
    pub fn validated(self) -> AppResult<NewBook> {
        self.validate()?;

        Ok(NewBook {
            title: self.title.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            isbn: self.isbn.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            quantity: self.quantity.unwrap_or_default(),
        })
    }
}

/// Catalog listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Only books with at least one copy available
    pub available: Option<bool>,
}

/// Number of copies available after changing a book's quantity.
///
/// Copies currently on loan stay on loan, so the available count moves by
/// the same delta as the quantity. Returns `None` when the new quantity is
/// smaller than the number of copies out.
pub fn rebalance_available(old_quantity: i32, old_available: i32, new_quantity: i32) -> Option<i32> {
    let on_loan = old_quantity - old_available;
    let available = new_quantity - on_loan;
    (available >= 0).then_some(available)
}
