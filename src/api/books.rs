//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, BookInput, BookQuery},
};

use super::{AuthenticatedUser, CreatedResponse};

/// Search the catalog
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(
        ("title" = Option<String>, Query, description = "Search in title"),
        ("author" = Option<String>, Query, description = "Search in author"),
        ("category" = Option<String>, Query, description = "Exact category"),
        ("available" = Option<bool>, Query, description = "Only books with a copy on the shelf")
    ),
    responses(
        (status = 200, description = "Matching books ordered by title", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.search_books(&query).await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = CreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(input): Json<BookInput>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.services.catalog.create_book(&user.context(), input).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookInput,
    responses(
        (status = 204, description = "Book updated"),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(input): Json<BookInput>,
) -> AppResult<StatusCode> {
    state.services.catalog.update_book(&user.context(), id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book is currently borrowed")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(&user.context(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
