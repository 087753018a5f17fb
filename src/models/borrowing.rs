//! Borrowing (loan) model and related types

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Borrowing model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub user_id: i32,
    /// `None` once the book has been removed from the catalog
    pub book_id: Option<i32>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    /// Coupon redeemed when the book was borrowed
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Computed status of a borrowing. Only `return_date` is stored; overdue is a
/// view over the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Active,
    Overdue,
    Returned,
}

impl BorrowingStatus {
    pub fn derive(due_date: NaiveDate, return_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        if return_date.is_some() {
            BorrowingStatus::Returned
        } else if due_date < today {
            BorrowingStatus::Overdue
        } else {
            BorrowingStatus::Active
        }
    }
}

/// Due date of a loan started on `borrow_date`
pub fn due_date_for(borrow_date: NaiveDate, loan_days: i64) -> NaiveDate {
    borrow_date + Duration::days(loan_days)
}

/// Joined row used by the borrowing listings
#[derive(Debug, Clone, FromRow)]
pub struct BorrowingRow {
    pub id: i32,
    pub user_id: i32,
    pub user_name: Option<String>,
    pub book_id: Option<i32>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub coupon_code: Option<String>,
}

/// Borrowing enriched with book (and, for staff listings, user) details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    pub user_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub book_id: Option<i32>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub coupon_code: Option<String>,
    pub status: BorrowingStatus,
}

impl BorrowingDetails {
    pub fn from_row(row: BorrowingRow, today: NaiveDate) -> Self {
        Self {
            status: BorrowingStatus::derive(row.due_date, row.return_date, today),
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            book_id: row.book_id,
            title: row.title,
            author: row.author,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_date: row.return_date,
            coupon_code: row.coupon_code,
        }
    }
}

/// Stored-state filter for the staff listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStateFilter {
    /// Not yet returned
    Active,
    Returned,
}

/// Borrowing listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    pub status: Option<BorrowingStateFilter>,
    /// Only open borrowings past their due date
    pub overdue: Option<bool>,
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BorrowBook {
    pub user_id: i32,
    pub book_id: i32,
    /// Optional special-offer coupon applied to this loan
    pub coupon_code: Option<String>,
}

/// Outcome of a successful borrow
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowReceipt {
    pub borrowing_id: i32,
    pub due_date: NaiveDate,
    /// Discount granted by the redeemed coupon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_due_date() {
        assert_eq!(due_date_for(date(2024, 1, 1), 14), date(2024, 1, 15));
        assert_eq!(due_date_for(date(2024, 2, 20), 14), date(2024, 3, 5));
    }

    #[test]
    fn test_status_derivation() {
        let due = date(2024, 3, 10);

        assert_eq!(BorrowingStatus::derive(due, None, date(2024, 3, 1)), BorrowingStatus::Active);
        // due today is not yet overdue
        assert_eq!(BorrowingStatus::derive(due, None, due), BorrowingStatus::Active);
        assert_eq!(BorrowingStatus::derive(due, None, date(2024, 3, 11)), BorrowingStatus::Overdue);
        assert_eq!(
            BorrowingStatus::derive(due, Some(date(2024, 3, 20)), date(2024, 4, 1)),
            BorrowingStatus::Returned
        );
    }

    #[test]
    fn test_details_from_row() {
        let row = BorrowingRow {
            id: 1,
            user_id: 2,
            user_name: None,
            book_id: Some(3),
            title: Some("Dune".to_string()),
            author: Some("Frank Herbert".to_string()),
            borrow_date: date(2024, 1, 1),
            due_date: date(2024, 1, 15),
            return_date: None,
            coupon_code: None,
        };
        let details = BorrowingDetails::from_row(row, date(2024, 1, 20));
        assert_eq!(details.status, BorrowingStatus::Overdue);

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["status"], "overdue");
        assert!(json.get("user_name").is_none());
    }

    #[test]
    fn test_state_filter_deserialize() {
        let query: BorrowingQuery = serde_json::from_str(r#"{"status":"returned"}"#).unwrap();
        assert_eq!(query.status, Some(BorrowingStateFilter::Returned));
        assert_eq!(query.overdue, None);
    }
}
