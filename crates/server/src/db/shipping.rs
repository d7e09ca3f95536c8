//! Shipping method and product-restriction repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use portobello_core::{ProductId, ShippingMethodId, ShopId};

use super::RepositoryError;
use crate::models::ShippingMethod;

const METHOD_COLUMNS: &str = "id, shop_id, name, carrier, rate, active, created_at, updated_at";

/// Fields accepted by [`ShippingRepository::update_method`].
#[derive(Debug, Default)]
pub struct ShippingMethodUpdate<'a> {
    pub name: Option<&'a str>,
    pub carrier: Option<&'a str>,
    pub rate: Option<Decimal>,
    pub active: Option<bool>,
}

/// Repository for shipping methods and per-product restrictions.
pub struct ShippingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingRepository<'a> {
    /// Create a new shipping repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a method by ID within a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_method(
        &self,
        shop_id: ShopId,
        id: ShippingMethodId,
    ) -> Result<Option<ShippingMethod>, RepositoryError> {
        let method = sqlx::query_as::<_, ShippingMethod>(&format!(
            "SELECT {METHOD_COLUMNS} FROM shipping_methods WHERE id = $1 AND shop_id = $2"
        ))
        .bind(id)
        .bind(shop_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(method)
    }

    /// List a shop's active shipping methods.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, shop_id: ShopId) -> Result<Vec<ShippingMethod>, RepositoryError> {
        let methods = sqlx::query_as::<_, ShippingMethod>(&format!(
            "SELECT {METHOD_COLUMNS} FROM shipping_methods
             WHERE shop_id = $1 AND active = TRUE
             ORDER BY rate ASC, id ASC"
        ))
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        Ok(methods)
    }

    /// List all of a shop's shipping methods for the vendor dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop(
        &self,
        shop_id: ShopId,
    ) -> Result<Vec<ShippingMethod>, RepositoryError> {
        let methods = sqlx::query_as::<_, ShippingMethod>(&format!(
            "SELECT {METHOD_COLUMNS} FROM shipping_methods
             WHERE shop_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        Ok(methods)
    }

    /// Create a shipping method for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_method(
        &self,
        shop_id: ShopId,
        name: &str,
        carrier: Option<&str>,
        rate: Decimal,
    ) -> Result<ShippingMethod, RepositoryError> {
        let method = sqlx::query_as::<_, ShippingMethod>(&format!(
            "INSERT INTO shipping_methods (shop_id, name, carrier, rate)
             VALUES ($1, $2, $3, $4)
             RETURNING {METHOD_COLUMNS}"
        ))
        .bind(shop_id)
        .bind(name)
        .bind(carrier)
        .bind(rate)
        .fetch_one(self.pool)
        .await?;

        Ok(method)
    }

    /// Apply a partial update to a shipping method.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such method exists in the shop.
    pub async fn update_method(
        &self,
        shop_id: ShopId,
        id: ShippingMethodId,
        update: ShippingMethodUpdate<'_>,
    ) -> Result<ShippingMethod, RepositoryError> {
        sqlx::query_as::<_, ShippingMethod>(&format!(
            "UPDATE shipping_methods SET
                 name = COALESCE($3, name),
                 carrier = COALESCE($4, carrier),
                 rate = COALESCE($5, rate),
                 active = COALESCE($6, active),
                 updated_at = NOW()
             WHERE id = $1 AND shop_id = $2
             RETURNING {METHOD_COLUMNS}"
        ))
        .bind(id)
        .bind(shop_id)
        .bind(update.name)
        .bind(update.carrier)
        .bind(update.rate)
        .bind(update.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a shipping method from a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such method exists in the shop.
    pub async fn delete_method(
        &self,
        shop_id: ShopId,
        id: ShippingMethodId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shipping_methods WHERE id = $1 AND shop_id = $2")
            .bind(id)
            .bind(shop_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Fetch restriction rows for a set of products as
    /// `(product_id, shipping_method_id)` pairs.
    ///
    /// Products with no rows are absent from the result; callers treat
    /// absence as "all methods permitted".
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn restrictions_for_products(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<(ProductId, ShippingMethodId)>, RepositoryError> {
        let raw: Vec<i64> = product_ids.iter().map(|id| id.as_i64()).collect();
        let rows: Vec<(ProductId, ShippingMethodId)> = sqlx::query_as(
            "SELECT product_id, shipping_method_id
             FROM product_shipping_restrictions
             WHERE product_id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Replace a product's restriction list.
    ///
    /// An empty list removes all rows, returning the product to the
    /// "all methods permitted" default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn replace_restrictions(
        &self,
        product_id: ProductId,
        method_ids: &[ShippingMethodId],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM product_shipping_restrictions WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        for method_id in method_ids {
            sqlx::query(
                "INSERT INTO product_shipping_restrictions (product_id, shipping_method_id)
                 VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(product_id)
            .bind(method_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
