//! Catalog management service

use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{rebalance_available, Book, BookInput, BookQuery, NewBook},
        user::AuthContext,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut conn = self.repository.acquire().await?;
        self.repository.books.search(&mut conn, query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        let mut conn = self.repository.acquire().await?;
        self.repository.books.get_by_id(&mut conn, id).await
    }

    /// Add a book to the catalog, every copy available
    pub async fn create_book(&self, ctx: &AuthContext, input: BookInput) -> AppResult<i32> {
        ctx.require_librarian()?;
        let book = input.validated()?;

        let mut tx = self.repository.begin().await?;
        let result = self.repository.books.create(&mut tx, &book).await;
        let id = self
            .repository
            .finish(tx, &format!("create book '{}'", book.title), result)
            .await?;

        tracing::info!("New book added: {} by {} (id={})", book.title, book.author, id);
        Ok(id)
    }

    /// Update a book. Changing the quantity shifts the available count by the
    /// same amount; copies on loan stay on loan.
    pub async fn update_book(&self, ctx: &AuthContext, id: i32, input: BookInput) -> AppResult<()> {
        ctx.require_librarian()?;
        let book = input.validated()?;

        let mut tx = self.repository.begin().await?;
        let result = self.update_locked(&mut tx, id, &book).await;
        self.repository
            .finish(tx, &format!("update book id={}", id), result)
            .await?;

        tracing::info!("Book updated: id={}", id);
        Ok(())
    }

    async fn update_locked(&self, conn: &mut PgConnection, id: i32, book: &NewBook) -> AppResult<()> {
        let current = self
            .repository
            .books
            .lock(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let available = rebalance_available(current.quantity, current.available, book.quantity)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Quantity cannot be less than the number of copies on loan ({})",
                    current.quantity - current.available
                ))
            })?;

        self.repository.books.update(conn, id, book, available).await
    }

    /// Remove a book from the catalog unless a copy is on loan
    pub async fn delete_book(&self, ctx: &AuthContext, id: i32) -> AppResult<()> {
        ctx.require_librarian()?;

        let mut tx = self.repository.begin().await?;
        let result = self.delete_locked(&mut tx, id).await;
        self.repository
            .finish(tx, &format!("delete book id={}", id), result)
            .await?;

        tracing::info!("Book deleted: id={}", id);
        Ok(())
    }

    async fn delete_locked(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        // the row lock keeps a concurrent borrow from slipping in
        self.repository
            .books
            .lock(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let open = self.repository.borrowings.count_open_for_book(conn, id).await?;
        if open > 0 {
            return Err(AppError::InUse(
                "Cannot delete book that is currently borrowed".to_string(),
            ));
        }

        self.repository.books.delete(conn, id).await?;
        Ok(())
    }
}
