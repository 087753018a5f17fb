//! Special offer and coupon service

use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::{
    error::{AppError, AppResult},
    models::{
        offer::{
            coupon_key, evaluate_coupon, CouponRequest, CouponValidation, NewOffer, OfferInput,
            OfferQuery, SpecialOffer,
        },
        user::AuthContext,
    },
    repository::Repository,
};

use super::today;

#[derive(Clone)]
pub struct OffersService {
    repository: Repository,
}

impl OffersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search offers with filters
    pub async fn search_offers(&self, query: &OfferQuery) -> AppResult<Vec<SpecialOffer>> {
        let mut conn = self.repository.acquire().await?;
        self.repository.offers.search(&mut conn, query).await
    }

    /// Get offer by ID
    pub async fn get_offer(&self, id: i32) -> AppResult<SpecialOffer> {
        let mut conn = self.repository.acquire().await?;
        self.repository.offers.get_by_id(&mut conn, id).await
    }

    /// Create an offer with a unique coupon code
    pub async fn create_offer(&self, ctx: &AuthContext, input: OfferInput) -> AppResult<i32> {
        ctx.require_admin()?;
        let offer = input.validated()?;

        let mut tx = self.repository.begin().await?;
        let result = self.create_locked(&mut tx, &offer).await;
        let id = self
            .repository
            .finish(tx, &format!("create offer '{}'", offer.coupon_code), result)
            .await?;

        tracing::info!("New offer added: {} (id={}, code={})", offer.title, id, offer.coupon_code);
        Ok(id)
    }

    async fn create_locked(&self, conn: &mut PgConnection, offer: &NewOffer) -> AppResult<i32> {
        if self
            .repository
            .offers
            .code_exists(conn, &offer.coupon_code, None)
            .await?
        {
            return Err(AppError::DuplicateCouponCode(offer.coupon_code.clone()));
        }

        self.repository.offers.create(conn, offer).await
    }

    /// Replace an offer's fields. The usage count is kept.
    pub async fn update_offer(&self, ctx: &AuthContext, id: i32, input: OfferInput) -> AppResult<()> {
        ctx.require_admin()?;
        let offer = input.validated()?;

        let mut tx = self.repository.begin().await?;
        let result = self.update_locked(&mut tx, id, &offer).await;
        self.repository
            .finish(tx, &format!("update offer id={}", id), result)
            .await?;

        tracing::info!("Offer updated: id={}", id);
        Ok(())
    }

    async fn update_locked(&self, conn: &mut PgConnection, id: i32, offer: &NewOffer) -> AppResult<()> {
        self.repository
            .offers
            .lock(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offer with ID {} not found", id)))?;

        if self
            .repository
            .offers
            .code_exists(conn, &offer.coupon_code, Some(id))
            .await?
        {
            return Err(AppError::DuplicateCouponCode(offer.coupon_code.clone()));
        }

        self.repository.offers.update(conn, id, offer).await
    }

    /// Delete an offer no borrowing refers to
    pub async fn delete_offer(&self, ctx: &AuthContext, id: i32) -> AppResult<()> {
        ctx.require_admin()?;

        let mut tx = self.repository.begin().await?;
        let result = self.delete_locked(&mut tx, id).await;
        self.repository
            .finish(tx, &format!("delete offer id={}", id), result)
            .await?;

        tracing::info!("Offer deleted: id={}", id);
        Ok(())
    }

    async fn delete_locked(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        let offer = self
            .repository
            .offers
            .lock(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offer with ID {} not found", id)))?;

        let references = self
            .repository
            .borrowings
            .count_with_coupon(conn, &offer.coupon_code)
            .await?;
        if references > 0 {
            return Err(AppError::InUse(
                "Cannot delete offer that is currently in use".to_string(),
            ));
        }

        self.repository.offers.delete(conn, id).await
    }

    /// Check a coupon without redeeming it
    pub async fn validate_coupon(
        &self,
        code: &str,
        book_count: i32,
        category: Option<&str>,
    ) -> AppResult<CouponValidation> {
        let mut conn = self.repository.acquire().await?;
        let offer = self
            .repository
            .offers
            .find_active_by_code(&mut conn, coupon_key(code))
            .await?;
        Ok(evaluate_coupon(offer.as_ref(), today(), book_count, category))
    }

    /// Add one redemption to an offer.
    ///
    /// Does not look at the coupon rules; [`redeem_coupon`](Self::redeem_coupon)
    /// is the checked path.
    pub async fn increment_usage(&self, ctx: &AuthContext, id: i32) -> AppResult<i32> {
        ctx.require_admin()?;

        let mut tx = self.repository.begin().await?;
        let result = self.repository.offers.increment_usage(&mut tx, id).await;
        let usage_count = self
            .repository
            .finish(tx, &format!("increment usage offer id={}", id), result)
            .await?;

        tracing::info!("Offer usage incremented: id={} usage_count={}", id, usage_count);
        Ok(usage_count)
    }

    /// Validate and, when valid, redeem a coupon in one transaction
    pub async fn redeem_coupon(
        &self,
        ctx: &AuthContext,
        request: &CouponRequest,
    ) -> AppResult<CouponValidation> {
        let mut tx = self.repository.begin().await?;
        let result = redeem_locked(
            &self.repository,
            &mut tx,
            &request.code,
            request.book_count,
            request.category.as_deref(),
            today(),
        )
        .await;
        let validation = self
            .repository
            .finish(
                tx,
                &format!("redeem coupon '{}' user_id={}", request.code, ctx.user_id),
                result,
            )
            .await?;

        if validation.valid {
            tracing::info!("Coupon redeemed: code={} user_id={}", request.code, ctx.user_id);
        }
        Ok(validation)
    }
}

/// Lock the offer behind `code`, apply the coupon rules and count the
/// redemption when they pass. Must run inside a transaction.
pub(crate) async fn redeem_locked(
    repository: &Repository,
    conn: &mut PgConnection,
    code: &str,
    book_count: i32,
    category: Option<&str>,
    today: NaiveDate,
) -> AppResult<CouponValidation> {
    let offer = repository
        .offers
        .lock_active_by_code(conn, coupon_key(code))
        .await?;
    let validation = evaluate_coupon(offer.as_ref(), today, book_count, category);

    if let (true, Some(offer)) = (validation.valid, offer.as_ref()) {
        repository.offers.increment_usage(conn, offer.id).await?;
    }

    Ok(validation)
}
