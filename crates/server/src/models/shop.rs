//! Shop (tenant) and product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use portobello_core::{ProductId, ProductStatus, ShopId, ShopStatus, UserId};

/// A vendor's storefront within the marketplace.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Shop {
    /// Unique shop ID.
    pub id: ShopId,
    /// Vendor account that owns this shop.
    pub vendor_id: UserId,
    /// Display name.
    pub name: String,
    /// URL slug, unique across the platform.
    pub slug: String,
    /// Lifecycle status. Suspended shops disappear from the storefront.
    pub status: ShopStatus,
    /// When the shop was created.
    pub created_at: DateTime<Utc>,
    /// When the shop was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A product listed in a shop.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Owning shop.
    pub shop_id: ShopId,
    /// Product title.
    pub title: String,
    /// Long-form description.
    pub description: Option<String>,
    /// Unit price in the major currency unit.
    pub price: Decimal,
    /// ISO 4217 currency code (e.g. "USD").
    pub currency: String,
    /// Visibility status.
    pub status: ProductStatus,
    /// Units in stock.
    pub inventory: i32,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}
