//! Special offer and coupon endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::offer::{CouponRequest, CouponValidation, OfferInput, OfferQuery, SpecialOffer},
};

use super::{AuthenticatedUser, CreatedResponse};

/// Usage counter after an increment
#[derive(Serialize, ToSchema)]
pub struct UsageResponse {
    pub usage_count: i32,
}

/// List special offers
#[utoipa::path(
    get,
    path = "/offers",
    tag = "offers",
    params(
        ("title" = Option<String>, Query, description = "Search in title"),
        ("category" = Option<String>, Query, description = "Category restriction"),
        ("is_active" = Option<bool>, Query, description = "Active flag"),
        ("start_date" = Option<String>, Query, description = "Starting on or after (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Ending on or before (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Offers, newest first", body = Vec<SpecialOffer>)
    )
)]
pub async fn list_offers(
    State(state): State<crate::AppState>,
    Query(query): Query<OfferQuery>,
) -> AppResult<Json<Vec<SpecialOffer>>> {
    let offers = state.services.offers.search_offers(&query).await?;
    Ok(Json(offers))
}

/// Get offer details by ID
#[utoipa::path(
    get,
    path = "/offers/{id}",
    tag = "offers",
    params(
        ("id" = i32, Path, description = "Offer ID")
    ),
    responses(
        (status = 200, description = "Offer details", body = SpecialOffer),
        (status = 404, description = "Offer not found")
    )
)]
pub async fn get_offer(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<SpecialOffer>> {
    let offer = state.services.offers.get_offer(id).await?;
    Ok(Json(offer))
}

/// Create a special offer
#[utoipa::path(
    post,
    path = "/offers",
    tag = "offers",
    security(("bearer_auth" = [])),
    request_body = OfferInput,
    responses(
        (status = 201, description = "Offer created", body = CreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required"),
        (status = 409, description = "Coupon code already exists")
    )
)]
pub async fn create_offer(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(input): Json<OfferInput>,
) -> AppResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.services.offers.create_offer(&user.context(), input).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Update a special offer
#[utoipa::path(
    put,
    path = "/offers/{id}",
    tag = "offers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Offer ID")
    ),
    request_body = OfferInput,
    responses(
        (status = 204, description = "Offer updated"),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Offer not found"),
        (status = 409, description = "Coupon code already exists")
    )
)]
pub async fn update_offer(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(input): Json<OfferInput>,
) -> AppResult<StatusCode> {
    state.services.offers.update_offer(&user.context(), id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a special offer
#[utoipa::path(
    delete,
    path = "/offers/{id}",
    tag = "offers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Offer ID")
    ),
    responses(
        (status = 204, description = "Offer deleted"),
        (status = 404, description = "Offer not found"),
        (status = 409, description = "Offer is referenced by borrowings")
    )
)]
pub async fn delete_offer(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.offers.delete_offer(&user.context(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add one redemption to an offer's usage counter
#[utoipa::path(
    post,
    path = "/offers/{id}/usage",
    tag = "offers",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Offer ID")
    ),
    responses(
        (status = 200, description = "Usage incremented", body = UsageResponse),
        (status = 404, description = "Offer not found")
    )
)]
pub async fn increment_usage(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<UsageResponse>> {
    let usage_count = state.services.offers.increment_usage(&user.context(), id).await?;
    Ok(Json(UsageResponse { usage_count }))
}

/// Check a coupon code without redeeming it
#[utoipa::path(
    post,
    path = "/coupons/validate",
    tag = "coupons",
    request_body = CouponRequest,
    responses(
        (status = 200, description = "Validation outcome", body = CouponValidation)
    )
)]
pub async fn validate_coupon(
    State(state): State<crate::AppState>,
    Json(request): Json<CouponRequest>,
) -> AppResult<Json<CouponValidation>> {
    let validation = state
        .services
        .offers
        .validate_coupon(&request.code, request.book_count, request.category.as_deref())
        .await?;
    Ok(Json(validation))
}

/// Validate a coupon and count the redemption when valid
#[utoipa::path(
    post,
    path = "/coupons/redeem",
    tag = "coupons",
    security(("bearer_auth" = [])),
    request_body = CouponRequest,
    responses(
        (status = 200, description = "Redemption outcome", body = CouponValidation)
    )
)]
pub async fn redeem_coupon(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CouponRequest>,
) -> AppResult<Json<CouponValidation>> {
    let validation = state
        .services
        .offers
        .redeem_coupon(&user.context(), &request)
        .await?;
    Ok(Json(validation))
}
