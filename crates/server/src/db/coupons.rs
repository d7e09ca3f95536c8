//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use portobello_core::{CouponId, CouponKind, ShopId};

use super::RepositoryError;
use crate::models::Coupon;

const COUPON_COLUMNS: &str = "id, shop_id, code, kind, value, starts_at, ends_at, \
                              usage_limit, times_used, active, created_at, updated_at";

/// Parameters for creating a coupon.
#[derive(Debug)]
pub struct CreateCoupon<'a> {
    /// Owning shop; `None` for a platform-wide coupon.
    pub shop_id: Option<ShopId>,
    pub code: &'a str,
    pub kind: CouponKind,
    pub value: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
}

/// Fields accepted by [`CouponRepository::update`].
#[derive(Debug, Default)]
pub struct CouponUpdate {
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub active: Option<bool>,
}

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a coupon by code redeemable against a given shop: either scoped
    /// to that shop or platform-wide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_for_redemption(
        &self,
        code: &str,
        shop_id: ShopId,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons
             WHERE code = $1 AND (shop_id = $2 OR shop_id IS NULL)
             ORDER BY shop_id NULLS LAST
             LIMIT 1"
        ))
        .bind(code)
        .bind(shop_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(coupon)
    }

    /// List coupons scoped to a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop(&self, shop_id: ShopId) -> Result<Vec<Coupon>, RepositoryError> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons
             WHERE shop_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        Ok(coupons)
    }

    /// List platform-wide coupons (admin surface).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_platform(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons
             WHERE shop_id IS NULL
             ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(coupons)
    }

    /// Get a coupon by ID, optionally constrained to a shop scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_scoped(
        &self,
        id: CouponId,
        shop_id: Option<ShopId>,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons
             WHERE id = $1 AND shop_id IS NOT DISTINCT FROM $2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(coupon)
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already taken in
    /// the same scope.
    pub async fn create(&self, params: CreateCoupon<'_>) -> Result<Coupon, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "INSERT INTO coupons (shop_id, code, kind, value, starts_at, ends_at, usage_limit)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(params.shop_id)
        .bind(params.code)
        .bind(params.kind)
        .bind(params.value)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(params.usage_limit)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "coupon code"))?;

        Ok(coupon)
    }

    /// Apply a partial update to a coupon within a scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such coupon exists in the scope.
    pub async fn update(
        &self,
        id: CouponId,
        shop_id: Option<ShopId>,
        update: CouponUpdate,
    ) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "UPDATE coupons SET
                 ends_at = COALESCE($3, ends_at),
                 usage_limit = COALESCE($4, usage_limit),
                 active = COALESCE($5, active),
                 updated_at = NOW()
             WHERE id = $1 AND shop_id IS NOT DISTINCT FROM $2
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id)
        .bind(shop_id)
        .bind(update.ends_at)
        .bind(update.usage_limit)
        .bind(update.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a coupon within a scope.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such coupon exists in the scope.
    pub async fn delete(
        &self,
        id: CouponId,
        shop_id: Option<ShopId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1 AND shop_id IS NOT DISTINCT FROM $2")
            .bind(id)
            .bind(shop_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a redemption inside a checkout transaction, refusing once the
    /// usage limit is reached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when the limit is exhausted.
    pub async fn record_redemption(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        id: CouponId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE coupons SET times_used = times_used + 1, updated_at = NOW()
             WHERE id = $1 AND (usage_limit IS NULL OR times_used < usage_limit)",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "coupon usage limit reached".to_string(),
            ));
        }
        Ok(())
    }
}
