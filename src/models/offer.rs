//! Special offer (coupon) model, coupon rules and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::AppResult;

/// Special offer model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SpecialOffer {
    pub id: i32,
    pub title: String,
    pub description: String,
    /// 1 to 100
    pub discount_percent: i32,
    pub coupon_code: String,
    /// `None` means unlimited
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub min_books: i32,
    /// `None` means any category
    pub category_restriction: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create / update offer request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_offer_window", skip_on_field_errors = true))]
pub struct OfferInput {
    #[validate(
        required(message = "Missing required field: title"),
        custom(function = "crate::models::not_blank", message = "Missing required field: title"),
        length(max = 255, message = "Field too long: title (max 255 characters)")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Missing required field: description"),
        custom(function = "crate::models::not_blank", message = "Missing required field: description")
    )]
    pub description: Option<String>,
    #[validate(
        required(message = "Missing required field: discount_percent"),
        range(min = 1, max = 100, message = "Invalid discount percentage")
    )]
    pub discount_percent: Option<i32>,
    #[validate(
        required(message = "Missing required field: coupon_code"),
        custom(function = "crate::models::not_blank", message = "Missing required field: coupon_code"),
        length(max = 50, message = "Field too long: coupon_code (max 50 characters)")
    )]
    pub coupon_code: Option<String>,
    /// 0 or absent means unlimited
    #[validate(range(min = 0, message = "Invalid usage limit"))]
    pub usage_limit: Option<i32>,
    /// 0 or absent means 1
    #[validate(range(min = 0, message = "Invalid minimum books requirement"))]
    pub min_books: Option<i32>,
    /// Empty or absent means any category
    #[validate(length(max = 100, message = "Field too long: category_restriction (max 100 characters)"))]
    pub category_restriction: Option<String>,
    #[validate(required(message = "Missing required field: start_date"))]
    pub start_date: Option<NaiveDate>,
    #[validate(required(message = "Missing required field: end_date"))]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_active: bool,
}

fn validate_offer_window(input: &OfferInput) -> Result<(), ValidationError> {
    match (input.start_date, input.end_date) {
        (Some(start), Some(end)) if start > end => {
            let mut err = ValidationError::new("date_window");
            err.message = Some("Start date must be before end date".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Validated and normalized offer fields, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOffer {
    pub title: String,
    pub description: String,
    pub discount_percent: i32,
    pub coupon_code: String,
    pub usage_limit: Option<i32>,
    pub min_books: i32,
    pub category_restriction: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

impl OfferInput {
    /// Validate the request and normalize the optional restrictions
    pub fn validated(self) -> AppResult<NewOffer> {
        self.validate()?;

        Ok(NewOffer {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            discount_percent: self.discount_percent.unwrap_or_default(),
            coupon_code: self
                .coupon_code
                .as_deref()
                .map(coupon_key)
                .unwrap_or_default()
                .to_string(),
            usage_limit: self.usage_limit.filter(|limit| *limit > 0),
            min_books: self.min_books.filter(|n| *n > 0).unwrap_or(1),
            category_restriction: self.category_restriction.filter(|c| !c.is_empty()),
            start_date: self.start_date.unwrap_or_default(),
            end_date: self.end_date.unwrap_or_default(),
            is_active: self.is_active,
        })
    }
}

/// Offer listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct OfferQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Exact category restriction
    pub category: Option<String>,
    pub is_active: Option<bool>,
    /// Offers starting on or after this date
    pub start_date: Option<NaiveDate>,
    /// Offers ending on or before this date
    pub end_date: Option<NaiveDate>,
}

/// Coupon check request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CouponRequest {
    pub code: String,
    /// Number of books in the basket
    pub book_count: i32,
    /// Category of the books, when known
    pub category: Option<String>,
}

/// Outcome of a coupon check. Business-rule rejections are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CouponValidation {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i32>,
}

impl CouponValidation {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            discount_percent: None,
        }
    }
}

/// Form under which a coupon code is stored and looked up: surrounding
/// whitespace dropped, case kept.
pub fn coupon_key(code: &str) -> &str {
    code.trim()
}

/// Apply the coupon rules, first failing rule wins.
///
/// `offer` is the active offer carrying the code, if any.
pub fn evaluate_coupon(
    offer: Option<&SpecialOffer>,
    today: NaiveDate,
    book_count: i32,
    category: Option<&str>,
) -> CouponValidation {
    let Some(offer) = offer else {
        return CouponValidation::rejected("Invalid coupon code");
    };

    if today < offer.start_date || today > offer.end_date {
        return CouponValidation::rejected("Coupon code has expired");
    }

    if let Some(limit) = offer.usage_limit {
        if offer.usage_count >= limit {
            return CouponValidation::rejected("Coupon code has reached its usage limit");
        }
    }

    if offer.min_books > book_count {
        return CouponValidation::rejected(format!("Minimum {} books required", offer.min_books));
    }

    if let (Some(restriction), Some(category)) = (offer.category_restriction.as_deref(), category) {
        if restriction != category {
            return CouponValidation::rejected(format!(
                "Coupon code is only valid for {} books",
                restriction
            ));
        }
    }

    CouponValidation {
        valid: true,
        message: "Coupon code is valid".to_string(),
        discount_percent: Some(offer.discount_percent),
    }
}
