//! Product repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use portobello_core::{ProductId, ProductStatus, ShopId};

use super::RepositoryError;
use crate::models::{Page, PageQuery, Product};

const SORT_WHITELIST: &[(&str, &str)] = &[
    ("created_at", "created_at"),
    ("title", "title"),
    ("price", "price"),
    ("inventory", "inventory"),
];

const PRODUCT_COLUMNS: &str =
    "id, shop_id, title, description, price, currency, status, inventory, created_at, updated_at";

/// Fields accepted by [`ProductRepository::update`]; `None` leaves the
/// column untouched.
#[derive(Debug, Default)]
pub struct ProductUpdate<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub status: Option<ProductStatus>,
    pub inventory: Option<i32>,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Fetch all products for a set of IDs, preserving no particular order.
    ///
    /// Used by the shipping filter and checkout, which need the full cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// List a shop's active products for the storefront, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(
        &self,
        shop_id: ShopId,
        query: &PageQuery,
    ) -> Result<Page<Product>, RepositoryError> {
        let column = query.sort_column(SORT_WHITELIST, "created_at");
        let dir = query.dir().as_sql();

        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE shop_id = $1 AND status = 'active'
             ORDER BY {column} {dir}
             LIMIT $2 OFFSET $3"
        ))
        .bind(shop_id)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE shop_id = $1 AND status = 'active'",
        )
        .bind(shop_id)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(rows, total, query))
    }

    /// List all of a shop's products for the vendor dashboard, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_shop(
        &self,
        shop_id: ShopId,
        query: &PageQuery,
    ) -> Result<Page<Product>, RepositoryError> {
        let column = query.sort_column(SORT_WHITELIST, "created_at");
        let dir = query.dir().as_sql();

        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE shop_id = $1
             ORDER BY {column} {dir}
             LIMIT $2 OFFSET $3"
        ))
        .bind(shop_id)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE shop_id = $1")
            .bind(shop_id)
            .fetch_one(self.pool)
            .await?;

        Ok(Page::new(rows, total, query))
    }

    /// Create a product in a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        shop_id: ShopId,
        title: &str,
        description: Option<&str>,
        price: Decimal,
        currency: &str,
        inventory: i32,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (shop_id, title, description, price, currency, inventory)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(shop_id)
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(currency)
        .bind(inventory)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists in the shop.
    pub async fn update(
        &self,
        shop_id: ShopId,
        id: ProductId,
        update: ProductUpdate<'_>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET
                 title = COALESCE($3, title),
                 description = COALESCE($4, description),
                 price = COALESCE($5, price),
                 status = COALESCE($6, status),
                 inventory = COALESCE($7, inventory),
                 updated_at = NOW()
             WHERE id = $1 AND shop_id = $2
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(shop_id)
        .bind(update.title)
        .bind(update.description)
        .bind(update.price)
        .bind(update.status)
        .bind(update.inventory)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product from a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists in the shop.
    pub async fn delete(&self, shop_id: ShopId, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND shop_id = $2")
            .bind(id)
            .bind(shop_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Decrement inventory for a purchased quantity, refusing to oversell.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when stock is insufficient.
    pub async fn reserve_inventory(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET inventory = inventory - $2, updated_at = NOW()
             WHERE id = $1 AND inventory >= $2",
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "insufficient inventory for product {id}"
            )));
        }
        Ok(())
    }
}
