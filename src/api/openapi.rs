//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrowings, health, offers};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FOBMS API",
        version = "1.0.0",
        description = "Library lending and special offers REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrowings
        borrowings::borrow_book,
        borrowings::return_book,
        borrowings::get_user_borrowings,
        borrowings::list_borrowings,
        borrowings::list_overdue,
        // Offers
        offers::list_offers,
        offers::get_offer,
        offers::create_offer,
        offers::update_offer,
        offers::delete_offer,
        offers::increment_usage,
        // Coupons
        offers::validate_coupon,
        offers::redeem_coupon,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookInput,
            // Borrowings
            crate::models::borrowing::BorrowBook,
            crate::models::borrowing::BorrowReceipt,
            crate::models::borrowing::BorrowingDetails,
            crate::models::borrowing::BorrowingStatus,
            // Offers
            crate::models::offer::SpecialOffer,
            crate::models::offer::OfferInput,
            crate::models::offer::CouponRequest,
            crate::models::offer::CouponValidation,
            offers::UsageResponse,
            // Common
            crate::api::CreatedResponse,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "borrowings", description = "Lending"),
        (name = "offers", description = "Special offer management"),
        (name = "coupons", description = "Coupon validation and redemption")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_route_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/books",
            "/books/{id}",
            "/borrowings",
            "/borrowings/{id}/return",
            "/borrowings/overdue",
            "/users/{id}/borrowings",
            "/offers",
            "/offers/{id}",
            "/offers/{id}/usage",
            "/coupons/validate",
            "/coupons/redeem",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
