//! Special offers repository for database operations

use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    error::{map_constraint_violation, AppError, AppResult},
    models::offer::{NewOffer, OfferQuery, SpecialOffer},
};

use super::contains_pattern;

const COUPON_CODE_KEY: &str = "special_offers_coupon_code_key";

#[derive(Clone, Copy)]
pub struct OffersRepository;

impl OffersRepository {
    /// Get offer by ID
    pub async fn get_by_id(&self, conn: &mut PgConnection, id: i32) -> AppResult<SpecialOffer> {
        sqlx::query_as::<_, SpecialOffer>("SELECT * FROM special_offers WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Offer with ID {} not found", id)))
    }

    /// Get offer by ID and lock the row until the transaction ends
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<SpecialOffer>> {
        let offer =
            sqlx::query_as::<_, SpecialOffer>("SELECT * FROM special_offers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(offer)
    }

    /// Active offer carrying this exact (case-sensitive) code
    pub async fn find_active_by_code(
        &self,
        conn: &mut PgConnection,
        code: &str,
    ) -> AppResult<Option<SpecialOffer>> {
        let offer = sqlx::query_as::<_, SpecialOffer>(
            "SELECT * FROM special_offers WHERE coupon_code = $1 AND is_active = TRUE",
        )
        .bind(code)
        .fetch_optional(conn)
        .await?;

        Ok(offer)
    }

    /// Same as [`find_active_by_code`](Self::find_active_by_code), locking the row
    pub async fn lock_active_by_code(
        &self,
        conn: &mut PgConnection,
        code: &str,
    ) -> AppResult<Option<SpecialOffer>> {
        let offer = sqlx::query_as::<_, SpecialOffer>(
            "SELECT * FROM special_offers WHERE coupon_code = $1 AND is_active = TRUE FOR UPDATE",
        )
        .bind(code)
        .fetch_optional(conn)
        .await?;

        Ok(offer)
    }

    /// Is the code taken by another offer?
    pub async fn code_exists(
        &self,
        conn: &mut PgConnection,
        code: &str,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM special_offers
                WHERE coupon_code = $1 AND ($2::INTEGER IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// List offers matching the filters, newest first
    pub async fn search(
        &self,
        conn: &mut PgConnection,
        query: &OfferQuery,
    ) -> AppResult<Vec<SpecialOffer>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM special_offers WHERE 1=1");

        if let Some(title) = query.title.as_deref().filter(|t| !t.is_empty()) {
            builder.push(" AND title ILIKE ").push_bind(contains_pattern(title));
        }

        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            builder
                .push(" AND category_restriction = ")
                .push_bind(category.to_string());
        }

        if let Some(is_active) = query.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }

        if let Some(start_date) = query.start_date {
            builder.push(" AND start_date >= ").push_bind(start_date);
        }

        if let Some(end_date) = query.end_date {
            builder.push(" AND end_date <= ").push_bind(end_date);
        }

        builder.push(" ORDER BY created_at DESC, id DESC");

        let offers = builder
            .build_query_as::<SpecialOffer>()
            .fetch_all(conn)
            .await?;
        Ok(offers)
    }

    /// Insert an offer with a zero usage count
    pub async fn create(&self, conn: &mut PgConnection, offer: &NewOffer) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO special_offers (
                title, description, discount_percent, coupon_code, usage_limit,
                min_books, category_restriction, start_date, end_date, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.discount_percent)
        .bind(&offer.coupon_code)
        .bind(offer.usage_limit)
        .bind(offer.min_books)
        .bind(&offer.category_restriction)
        .bind(offer.start_date)
        .bind(offer.end_date)
        .bind(offer.is_active)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            map_constraint_violation(e, COUPON_CODE_KEY, || {
                AppError::DuplicateCouponCode(offer.coupon_code.clone())
            })
        })
    }

    /// Overwrite every editable field; usage_count is left alone
    pub async fn update(&self, conn: &mut PgConnection, id: i32, offer: &NewOffer) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE special_offers
            SET title = $1, description = $2, discount_percent = $3, coupon_code = $4,
                usage_limit = $5, min_books = $6, category_restriction = $7,
                start_date = $8, end_date = $9, is_active = $10, updated_at = NOW()
            WHERE id = $11
            "#,
        )
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.discount_percent)
        .bind(&offer.coupon_code)
        .bind(offer.usage_limit)
        .bind(offer.min_books)
        .bind(&offer.category_restriction)
        .bind(offer.start_date)
        .bind(offer.end_date)
        .bind(offer.is_active)
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| {
            map_constraint_violation(e, COUPON_CODE_KEY, || {
                AppError::DuplicateCouponCode(offer.coupon_code.clone())
            })
        })?;

        Ok(())
    }

    /// Delete an offer
    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM special_offers WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Add one redemption, returns the new usage count
    pub async fn increment_usage(&self, conn: &mut PgConnection, id: i32) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE special_offers
            SET usage_count = usage_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING usage_count
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer with ID {} not found", id)))
    }
}
