//! Data models for FOBMS

pub mod book;
pub mod borrowing;
pub mod offer;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookInput, BookQuery};
pub use borrowing::{BorrowBook, BorrowReceipt, Borrowing, BorrowingDetails, BorrowingQuery, BorrowingStatus};
pub use offer::{CouponRequest, CouponValidation, OfferInput, OfferQuery, SpecialOffer};
pub use user::{AuthContext, Role, UserClaims};

use validator::ValidationError;

/// Required text must carry something besides whitespace
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
