//! Shipping method domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use portobello_core::{ShippingMethodId, ShopId};

/// A shop-level shipping method.
///
/// Per-product restriction rows narrow which methods a given product may
/// ship with; a product with no restriction rows ships with any of the
/// shop's methods.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ShippingMethod {
    /// Unique method ID.
    pub id: ShippingMethodId,
    /// Owning shop.
    pub shop_id: ShopId,
    /// Display name (e.g. "Standard", "Express").
    pub name: String,
    /// Carrier name, free-form.
    pub carrier: Option<String>,
    /// Flat rate in the shop's currency.
    pub rate: Decimal,
    /// Inactive methods are never offered at checkout.
    pub active: bool,
    /// When the method was created.
    pub created_at: DateTime<Utc>,
    /// When the method was last updated.
    pub updated_at: DateTime<Utc>,
}
