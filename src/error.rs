//! Error types for the FOBMS server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes reported alongside every error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    BookNotAvailable = 6,
    HasOverdueBorrowings = 7,
    AlreadyBorrowed = 8,
    InUse = 9,
    DuplicateCouponCode = 10,
    CouponRejected = 11,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book is not available for borrowing")]
    Unavailable,

    #[error("You have overdue books. Please return them first.")]
    HasOverdue,

    #[error("You have already borrowed this book")]
    DuplicateBorrow,

    #[error("{0}")]
    InUse(String),

    #[error("Coupon code '{0}' already exists")]
    DuplicateCouponCode(String),

    #[error("{0}")]
    CouponRejected(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Business-rule violations: the request was well formed but the current
    /// state of the library forbids it.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::Unavailable
                | AppError::HasOverdue
                | AppError::DuplicateBorrow
                | AppError::InUse(_)
                | AppError::DuplicateCouponCode(_)
                | AppError::CouponRejected(_)
        )
    }

    fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData),
            AppError::Unavailable => (StatusCode::CONFLICT, ErrorCode::BookNotAvailable),
            AppError::HasOverdue => (StatusCode::CONFLICT, ErrorCode::HasOverdueBorrowings),
            AppError::DuplicateBorrow => (StatusCode::CONFLICT, ErrorCode::AlreadyBorrowed),
            AppError::InUse(_) => (StatusCode::CONFLICT, ErrorCode::InUse),
            AppError::DuplicateCouponCode(_) => {
                (StatusCode::CONFLICT, ErrorCode::DuplicateCouponCode)
            }
            AppError::CouponRejected(_) => (StatusCode::CONFLICT, ErrorCode::CouponRejected),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for field: {}", field),
                })
            })
            .collect();

        // schema-level checks land under `__all__`
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Operation failed".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Operation failed".to_string()
            }
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Authentication(msg)
            | AppError::Authorization(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Name of the constraint a database error tripped, if any
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}

/// Maps a constraint violation onto the business error it stands for.
///
/// The schema keeps a partial unique index on open borrowings and a unique
/// index on coupon codes; when two requests race past the in-transaction
/// checks, the database rejects the loser and it is reported like the
/// check would have.
pub(crate) fn map_constraint_violation(
    err: sqlx::Error,
    constraint: &str,
    to: impl FnOnce() -> AppError,
) -> AppError {
    if violated_constraint(&err) == Some(constraint) {
        to()
    } else {
        AppError::Database(err)
    }
}
