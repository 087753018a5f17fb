//! Lending service: borrow, return and borrowing listings

use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        borrowing::{due_date_for, BorrowBook, BorrowReceipt, BorrowingDetails, BorrowingQuery},
        offer::coupon_key,
        user::AuthContext,
    },
    repository::Repository,
};

use super::{offers::redeem_locked, today};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    config: LendingConfig,
}

impl LendingService {
    pub fn new(repository: Repository, config: LendingConfig) -> Self {
        Self { repository, config }
    }

    /// Lend one copy of a book.
    ///
    /// Rules are checked in this order: the book must have a copy on the
    /// shelf, the borrower must hold no overdue loan and no open loan of the
    /// same book, and an optional coupon must validate for a single book of
    /// this category. All of it, coupon redemption included, commits or
    /// rolls back as a whole.
    pub async fn borrow_book(&self, ctx: &AuthContext, request: BorrowBook) -> AppResult<BorrowReceipt> {
        ctx.require_self_or_staff(request.user_id)?;

        let coupon_code = request
            .coupon_code
            .as_deref()
            .map(coupon_key)
            .filter(|code| !code.is_empty());

        let today = today();
        let mut tx = self.repository.begin().await?;
        let result = self
            .borrow_locked(&mut tx, request.user_id, request.book_id, coupon_code, today)
            .await;
        let receipt = self
            .repository
            .finish(
                tx,
                &format!("borrow book_id={} user_id={}", request.book_id, request.user_id),
                result,
            )
            .await?;

        tracing::info!(
            "Book borrowed: user_id={} book_id={} borrowing_id={} due={}",
            request.user_id,
            request.book_id,
            receipt.borrowing_id,
            receipt.due_date
        );
        Ok(receipt)
    }

    async fn borrow_locked(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
        coupon_code: Option<&str>,
        today: NaiveDate,
    ) -> AppResult<BorrowReceipt> {
        let book = match self.repository.books.lock(conn, book_id).await? {
            Some(book) if book.available > 0 => book,
            _ => return Err(AppError::Unavailable),
        };

        if self.repository.borrowings.has_overdue(conn, user_id, today).await? {
            return Err(AppError::HasOverdue);
        }

        if self.repository.borrowings.has_open(conn, user_id, book_id).await? {
            return Err(AppError::DuplicateBorrow);
        }

        let mut discount_percent = None;
        if let Some(code) = coupon_code {
            let validation =
                redeem_locked(&self.repository, conn, code, 1, Some(book.category.as_str()), today).await?;
            if !validation.valid {
                return Err(AppError::CouponRejected(validation.message));
            }
            discount_percent = validation.discount_percent;
        }

        let due_date = due_date_for(today, self.config.loan_days);
        let borrowing_id = self
            .repository
            .borrowings
            .create(conn, user_id, book_id, today, due_date, coupon_code)
            .await?;

        self.repository.books.decrement_available(conn, book_id).await?;

        Ok(BorrowReceipt {
            borrowing_id,
            due_date,
            discount_percent,
        })
    }

    /// Close an open borrowing and put the copy back on the shelf
    pub async fn return_book(&self, ctx: &AuthContext, borrowing_id: i32) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let result = self.return_locked(&mut tx, ctx, borrowing_id, today()).await;
        self.repository
            .finish(tx, &format!("return borrowing_id={}", borrowing_id), result)
            .await?;

        tracing::info!("Book returned: borrowing_id={}", borrowing_id);
        Ok(())
    }

    async fn return_locked(
        &self,
        conn: &mut PgConnection,
        ctx: &AuthContext,
        borrowing_id: i32,
        today: NaiveDate,
    ) -> AppResult<()> {
        let borrowing = self
            .repository
            .borrowings
            .lock_open(conn, borrowing_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Borrowing record not found or book already returned".to_string())
            })?;

        ctx.require_self_or_staff(borrowing.user_id)?;

        self.repository
            .borrowings
            .mark_returned(conn, borrowing.id, today)
            .await?;

        // an open loan keeps its book row alive
        let book_id = borrowing.book_id.ok_or_else(|| {
            AppError::Internal(format!("Open borrowing {} has no book", borrowing.id))
        })?;
        self.repository.books.increment_available(conn, book_id).await
    }

    /// Every borrowing of one user, most recent first
    pub async fn get_user_borrowings(
        &self,
        ctx: &AuthContext,
        user_id: i32,
    ) -> AppResult<Vec<BorrowingDetails>> {
        ctx.require_self_or_staff(user_id)?;

        let mut conn = self.repository.acquire().await?;
        self.repository
            .borrowings
            .list_for_user(&mut conn, user_id, today())
            .await
    }

    /// Staff listing of all borrowings
    pub async fn get_all_borrowings(
        &self,
        ctx: &AuthContext,
        query: &BorrowingQuery,
    ) -> AppResult<Vec<BorrowingDetails>> {
        ctx.require_librarian()?;

        let mut conn = self.repository.acquire().await?;
        self.repository.borrowings.list(&mut conn, query, today()).await
    }

    pub async fn get_overdue_borrowings(&self, ctx: &AuthContext) -> AppResult<Vec<BorrowingDetails>> {
        ctx.require_librarian()?;

        let mut conn = self.repository.acquire().await?;
        self.repository.borrowings.list_overdue(&mut conn, today()).await
    }
}
