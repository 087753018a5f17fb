//! Repository layer for database operations.
//!
//! Sub-repositories take a `&mut PgConnection` so the same query runs on a
//! pooled connection for reads or inside a transaction for writes. Services
//! own the transaction boundaries through [`Repository::begin`] and
//! [`Repository::finish`].

pub mod books;
pub mod borrowings;
pub mod offers;

use sqlx::{pool::PoolConnection, Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Open database transaction
pub type Tx = Transaction<'static, Postgres>;

/// Main repository struct holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub borrowings: borrowings::BorrowingsRepository,
    pub offers: offers::OffersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            books: books::BooksRepository,
            borrowings: borrowings::BorrowingsRepository,
            offers: offers::OffersRepository,
        }
    }

    /// Pooled connection for read-only work
    pub async fn acquire(&self) -> AppResult<PoolConnection<Postgres>> {
        Ok(self.pool.acquire().await?)
    }

    /// Start a transaction (READ COMMITTED; rows that are checked and then
    /// mutated are re-read with `FOR UPDATE`)
    pub async fn begin(&self) -> AppResult<Tx> {
        Ok(self.pool.begin().await?)
    }

    /// Commit on success, roll back on failure.
    ///
    /// The rollback happens before the error is handed back to the caller.
    pub async fn finish<T>(&self, tx: Tx, operation: &str, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("{}: rollback failed: {}", operation, rollback_err);
                }
                tracing::warn!("{}: rolled back: {}", operation, err);
                Err(err)
            }
        }
    }

    /// Round-trip to the database (readiness check)
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// `%term%` pattern for ILIKE, with LIKE wildcards in the term escaped
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
