//! Books repository for database operations

use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, NewBook},
};

use super::contains_pattern;

const BOOK_COLUMNS: &str =
    "id, title, author, isbn, category, quantity, available, created_at, updated_at";

#[derive(Clone, Copy)]
pub struct BooksRepository;

impl BooksRepository {
    /// Get book by ID
    pub async fn get_by_id(&self, conn: &mut PgConnection, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by ID and lock the row until the transaction ends
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(book)
    }

    /// List books matching the filters, ordered by title
    pub async fn search(&self, conn: &mut PgConnection, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM books WHERE 1=1", BOOK_COLUMNS));

        if let Some(title) = query.title.as_deref().filter(|t| !t.is_empty()) {
            builder.push(" AND title ILIKE ").push_bind(contains_pattern(title));
        }

        if let Some(author) = query.author.as_deref().filter(|a| !a.is_empty()) {
            builder.push(" AND author ILIKE ").push_bind(contains_pattern(author));
        }

        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            builder.push(" AND category = ").push_bind(category.to_string());
        }

        if query.available == Some(true) {
            builder.push(" AND available > 0");
        }

        builder.push(" ORDER BY title ASC, id ASC");

        let books = builder.build_query_as::<Book>().fetch_all(conn).await?;
        Ok(books)
    }

    /// Insert a book with every copy available
    pub async fn create(&self, conn: &mut PgConnection, book: &NewBook) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author, isbn, category, quantity, available)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(book.quantity)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Overwrite the bibliographic fields, quantity and availability
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: i32,
        book: &NewBook,
        available: i32,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3, category = $4,
                quantity = $5, available = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.category)
        .bind(book.quantity)
        .bind(available)
        .bind(id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Delete a book, returns false if it did not exist
    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Take one copy off the shelf
    pub async fn decrement_available(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE books SET available = available - 1, updated_at = NOW() WHERE id = $1 AND available > 0",
        )
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Unavailable);
        }
        Ok(())
    }

    /// Put one copy back on the shelf
    pub async fn increment_available(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE books SET available = available + 1, updated_at = NOW() WHERE id = $1 AND available < quantity",
        )
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Internal(format!(
                "Book {} has no copy on loan to return",
                id
            )));
        }
        Ok(())
    }
}
