//! Shop (tenant) repository.

use sqlx::PgPool;

use portobello_core::{ShopId, ShopStatus, UserId};

use super::RepositoryError;
use crate::models::{Page, PageQuery, Shop};

const SORT_WHITELIST: &[(&str, &str)] = &[
    ("created_at", "s.created_at"),
    ("name", "s.name"),
    ("status", "s.status"),
];

const SHOP_COLUMNS: &str = "id, vendor_id, name, slug, status, created_at, updated_at";

/// A shop joined with its vendor's contact details, for the admin tenant list.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct TenantListing {
    #[sqlx(flatten)]
    pub shop: Shop,
    /// Vendor email for the admin console.
    pub vendor_email: String,
    /// Vendor display name.
    pub vendor_name: String,
}

/// Repository for shop database operations.
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    /// Create a new shop repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a shop by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }

    /// Get an active shop by its public slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<Shop>, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shops WHERE slug = $1 AND status = 'active'"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }

    /// Get a shop owned by a specific vendor, or `None` if the shop exists
    /// but belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_owned(
        &self,
        id: ShopId,
        vendor_id: UserId,
    ) -> Result<Option<Shop>, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1 AND vendor_id = $2"
        ))
        .bind(id)
        .bind(vendor_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(shop)
    }

    /// List all shops owned by a vendor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_vendor(&self, vendor_id: UserId) -> Result<Vec<Shop>, RepositoryError> {
        let shops = sqlx::query_as::<_, Shop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shops WHERE vendor_id = $1 ORDER BY created_at DESC"
        ))
        .bind(vendor_id)
        .fetch_all(self.pool)
        .await?;

        Ok(shops)
    }

    /// Create a shop for a vendor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        vendor_id: UserId,
        name: &str,
        slug: &str,
    ) -> Result<Shop, RepositoryError> {
        let shop = sqlx::query_as::<_, Shop>(&format!(
            "INSERT INTO shops (vendor_id, name, slug)
             VALUES ($1, $2, $3)
             RETURNING {SHOP_COLUMNS}"
        ))
        .bind(vendor_id)
        .bind(name)
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "shop slug"))?;

        Ok(shop)
    }

    /// Rename a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such shop exists.
    pub async fn update_name(&self, id: ShopId, name: &str) -> Result<Shop, RepositoryError> {
        sqlx::query_as::<_, Shop>(&format!(
            "UPDATE shops SET name = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {SHOP_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set a shop's lifecycle status (admin suspend/activate).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such shop exists.
    pub async fn set_status(
        &self,
        id: ShopId,
        status: ShopStatus,
    ) -> Result<Shop, RepositoryError> {
        sqlx::query_as::<_, Shop>(&format!(
            "UPDATE shops SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {SHOP_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// List tenants with vendor contact details for the admin console,
    /// paginated, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_tenants(
        &self,
        query: &PageQuery,
        status: Option<ShopStatus>,
    ) -> Result<Page<TenantListing>, RepositoryError> {
        let column = query.sort_column(SORT_WHITELIST, "s.created_at");
        let dir = query.dir().as_sql();

        let rows = sqlx::query_as::<_, TenantListing>(&format!(
            "SELECT s.id, s.vendor_id, s.name, s.slug, s.status,
                    s.created_at, s.updated_at,
                    u.email AS vendor_email, u.name AS vendor_name
             FROM shops s
             JOIN users u ON u.id = s.vendor_id
             WHERE $1::shop_status IS NULL OR s.status = $1
             ORDER BY {column} {dir}
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shops WHERE $1::shop_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(rows, total, query))
    }

    /// Vendor email for a shop, used for suspension notices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such shop exists.
    pub async fn vendor_contact(&self, id: ShopId) -> Result<(String, String), RepositoryError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT u.email, u.name FROM shops s JOIN users u ON u.id = s.vendor_id
             WHERE s.id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
    }
}
