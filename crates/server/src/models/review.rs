//! Review domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use portobello_core::{OrderId, ProductId, ReviewId, ReviewStatus, UserId};

/// A product review derived from a purchase.
///
/// The (product, order) pair is unique: one review per product per purchase.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    /// Unique review ID.
    pub id: ReviewId,
    /// Reviewed product.
    pub product_id: ProductId,
    /// Order the purchase came from.
    pub order_id: OrderId,
    /// Reviewing user; `None` when the purchase was a guest checkout.
    pub user_id: Option<UserId>,
    /// Star rating, 1-5.
    pub rating: i16,
    /// Optional short headline.
    pub title: Option<String>,
    /// Review body.
    pub body: String,
    /// Moderation status; only `published` reviews are publicly visible.
    pub status: ReviewStatus,
    /// When the review was submitted.
    pub created_at: DateTime<Utc>,
    /// When the review was last updated.
    pub updated_at: DateTime<Utc>,
}
