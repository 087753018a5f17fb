//! Borrowings repository for database operations

use chrono::NaiveDate;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    error::{violated_constraint, AppError, AppResult},
    models::borrowing::{
        Borrowing, BorrowingDetails, BorrowingQuery, BorrowingRow, BorrowingStateFilter,
    },
};

/// Partial unique index: one open loan per (user, book)
const OPEN_LOAN_INDEX: &str = "borrowings_open_loan_key";

/// Every borrowing belongs to an existing user
const USER_FK: &str = "borrowings_user_id_fkey";

const STAFF_LISTING: &str = r#"
    SELECT b.id, b.user_id, u.name AS user_name, b.book_id, bk.title, bk.author,
           b.borrow_date, b.due_date, b.return_date, b.coupon_code
    FROM borrowings b
    JOIN users u ON b.user_id = u.id
    LEFT JOIN books bk ON b.book_id = bk.id
    WHERE 1=1"#;

#[derive(Clone, Copy)]
pub struct BorrowingsRepository;

impl BorrowingsRepository {
    /// Get an open borrowing and lock it until the transaction ends
    pub async fn lock_open(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<Borrowing>> {
        let borrowing = sqlx::query_as::<_, Borrowing>(
            "SELECT * FROM borrowings WHERE id = $1 AND return_date IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(borrowing)
    }

    /// Does the user hold an open loan past its due date?
    pub async fn has_overdue(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        today: NaiveDate,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrowings
                WHERE user_id = $1 AND return_date IS NULL AND due_date < $2
            )
            "#,
        )
        .bind(user_id)
        .bind(today)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// Does the user already hold an open loan of this book?
    pub async fn has_open(&self, conn: &mut PgConnection, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrowings
                WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// Insert an open borrowing
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
        due_date: NaiveDate,
        coupon_code: Option<&str>,
    ) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO borrowings (user_id, book_id, borrow_date, due_date, coupon_code)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrow_date)
        .bind(due_date)
        .bind(coupon_code)
        .fetch_one(conn)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some(OPEN_LOAN_INDEX) => AppError::DuplicateBorrow,
            Some(USER_FK) => AppError::NotFound(format!("User with id {} not found", user_id)),
            _ => AppError::Database(e),
        })
    }

    /// Close a borrowing
    pub async fn mark_returned(
        &self,
        conn: &mut PgConnection,
        id: i32,
        return_date: NaiveDate,
    ) -> AppResult<()> {
        sqlx::query("UPDATE borrowings SET return_date = $1 WHERE id = $2 AND return_date IS NULL")
            .bind(return_date)
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Open borrowings of a book
    pub async fn count_open_for_book(&self, conn: &mut PgConnection, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE book_id = $1 AND return_date IS NULL",
        )
        .bind(book_id)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Borrowings, open or not, that carry this coupon code
    pub async fn count_with_coupon(&self, conn: &mut PgConnection, coupon_code: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrowings WHERE coupon_code = $1")
            .bind(coupon_code)
            .fetch_one(conn)
            .await?;

        Ok(count)
    }

    /// Every borrowing of a user, most recent first
    pub async fn list_for_user(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        today: NaiveDate,
    ) -> AppResult<Vec<BorrowingDetails>> {
        let rows = sqlx::query_as::<_, BorrowingRow>(
            r#"
            SELECT b.id, b.user_id, NULL::VARCHAR AS user_name, b.book_id, bk.title, bk.author,
                   b.borrow_date, b.due_date, b.return_date, b.coupon_code
            FROM borrowings b
            LEFT JOIN books bk ON b.book_id = bk.id
            WHERE b.user_id = $1
            ORDER BY b.borrow_date DESC, b.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BorrowingDetails::from_row(row, today))
            .collect())
    }

    /// Staff listing with optional state / overdue filters, most recent first
    pub async fn list(
        &self,
        conn: &mut PgConnection,
        query: &BorrowingQuery,
        today: NaiveDate,
    ) -> AppResult<Vec<BorrowingDetails>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(STAFF_LISTING);

        match query.status {
            Some(BorrowingStateFilter::Active) => {
                builder.push(" AND b.return_date IS NULL");
            }
            Some(BorrowingStateFilter::Returned) => {
                builder.push(" AND b.return_date IS NOT NULL");
            }
            None => {}
        }

        if query.overdue == Some(true) {
            builder
                .push(" AND b.return_date IS NULL AND b.due_date < ")
                .push_bind(today);
        }

        builder.push(" ORDER BY b.borrow_date DESC, b.id DESC");

        let rows = builder
            .build_query_as::<BorrowingRow>()
            .fetch_all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| BorrowingDetails::from_row(row, today))
            .collect())
    }

    /// Open borrowings past their due date, soonest due first
    pub async fn list_overdue(
        &self,
        conn: &mut PgConnection,
        today: NaiveDate,
    ) -> AppResult<Vec<BorrowingDetails>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(STAFF_LISTING);
        builder
            .push(" AND b.return_date IS NULL AND b.due_date < ")
            .push_bind(today)
            .push(" ORDER BY b.due_date ASC, b.id ASC");

        let rows = builder
            .build_query_as::<BorrowingRow>()
            .fetch_all(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| BorrowingDetails::from_row(row, today))
            .collect())
    }
}
