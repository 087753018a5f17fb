//! API handlers for FOBMS REST endpoints

pub mod books;
pub mod borrowings;
pub mod health;
pub mod offers;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::user::{AuthContext, UserClaims},
    AppState,
};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

impl AuthenticatedUser {
    /// Caller identity handed to the services
    pub fn context(&self) -> AuthContext {
        AuthContext::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Identifier of a newly created record
#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i32,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books))
        .route("/books", post(books::create_book))
        .route("/books/:id", get(books::get_book))
        .route("/books/:id", put(books::update_book))
        .route("/books/:id", delete(books::delete_book))
        // Lending
        .route("/borrowings", get(borrowings::list_borrowings))
        .route("/borrowings", post(borrowings::borrow_book))
        .route("/borrowings/overdue", get(borrowings::list_overdue))
        .route("/borrowings/:id/return", post(borrowings::return_book))
        .route("/users/:id/borrowings", get(borrowings::get_user_borrowings))
        // Special offers
        .route("/offers", get(offers::list_offers))
        .route("/offers", post(offers::create_offer))
        .route("/offers/:id", get(offers::get_offer))
        .route("/offers/:id", put(offers::update_offer))
        .route("/offers/:id", delete(offers::delete_offer))
        .route("/offers/:id/usage", post(offers::increment_usage))
        // Coupons
        .route("/coupons/validate", post(offers::validate_coupon))
        .route("/coupons/redeem", post(offers::redeem_coupon))
        .with_state(state);

    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
