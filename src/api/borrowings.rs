//! Borrowing (lending) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::borrowing::{BorrowBook, BorrowReceipt, BorrowingDetails, BorrowingQuery},
};

use super::AuthenticatedUser;

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = BorrowBook,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowReceipt),
        (status = 403, description = "Cannot borrow for another user"),
        (status = 409, description = "Book unavailable, overdue loans, already borrowed or coupon rejected")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<BorrowBook>,
) -> AppResult<(StatusCode, Json<BorrowReceipt>)> {
    let receipt = state.services.lending.borrow_book(&user.context(), request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 204, description = "Book returned"),
        (status = 404, description = "Borrowing not found or already returned")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.lending.return_book(&user.context(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Borrowing history of a user
#[utoipa::path(
    get,
    path = "/users/{id}/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's borrowings, most recent first", body = Vec<BorrowingDetails>),
        (status = 403, description = "Not the user's own record")
    )
)]
pub async fn get_user_borrowings(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state
        .services
        .lending
        .get_user_borrowings(&user.context(), user_id)
        .await?;
    Ok(Json(borrowings))
}

/// List all borrowings
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "active or returned"),
        ("overdue" = Option<bool>, Query, description = "Only open borrowings past their due date")
    ),
    responses(
        (status = 200, description = "Borrowings, most recent first", body = Vec<BorrowingDetails>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state
        .services
        .lending
        .get_all_borrowings(&user.context(), &query)
        .await?;
    Ok(Json(borrowings))
}

/// List overdue borrowings
#[utoipa::path(
    get,
    path = "/borrowings/overdue",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue borrowings, soonest due first", body = Vec<BorrowingDetails>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    let borrowings = state
        .services
        .lending
        .get_overdue_borrowings(&user.context())
        .await?;
    Ok(Json(borrowings))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, header::CONTENT_TYPE, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{
        api::{
            create_router,
            test_support::{bearer, offline_state},
        },
        models::user::Role,
    };

    #[tokio::test]
    async fn test_member_cannot_borrow_for_someone_else() {
        let app = create_router(offline_state());
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/borrowings")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, bearer(3, Role::Member))
            .body(Body::from(r#"{"user_id":4,"book_id":1}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_overdue_listing_is_staff_only() {
        let app = create_router(offline_state());
        let request = Request::builder()
            .uri("/api/v1/borrowings/overdue")
            .header(AUTHORIZATION, bearer(3, Role::Member))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected() {
        let app = create_router(offline_state());
        let request = Request::builder()
            .uri("/api/v1/users/3/borrowings")
            .header(AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
