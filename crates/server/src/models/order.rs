//! Order, order item, and payment domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use portobello_core::{
    CouponId, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentStatus, ProductId,
    ShippingMethodId, ShopId, UserId,
};

/// A customer purchase against a single shop.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Human-facing order number (e.g. "PB-20260412-7F3K").
    pub number: String,
    /// Purchasing user; `None` for guest checkouts.
    pub user_id: Option<UserId>,
    /// Guest contact email when `user_id` is absent.
    pub guest_email: Option<String>,
    /// Shop the order was placed against.
    pub shop_id: ShopId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// ISO 4217 currency code shared by all amounts on this order.
    pub currency: String,
    /// Sum of line totals before adjustments.
    pub subtotal: Decimal,
    /// Coupon deduction applied to the subtotal.
    pub discount_total: Decimal,
    /// Tax charged on the discounted subtotal.
    pub tax_total: Decimal,
    /// Shipping method rate.
    pub shipping_total: Decimal,
    /// Grand total: subtotal - discount + tax + shipping.
    pub total: Decimal,
    /// Chosen shipping method.
    pub shipping_method_id: ShippingMethodId,
    /// Applied coupon, if any.
    pub coupon_id: Option<CouponId>,
    /// Destination country (ISO 3166-1 alpha-2).
    pub shipping_country: String,
    /// Destination region/state code, if provided.
    pub shipping_region: Option<String>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether this order counts as a completed purchase for review purposes.
    #[must_use]
    pub fn is_purchased(&self) -> bool {
        matches!(self.status, OrderStatus::Paid | OrderStatus::Fulfilled)
    }
}

/// A line item snapshot within an order.
///
/// Title and unit price are copied from the product at checkout time so
/// later product edits don't rewrite order history.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    /// Unique line item ID.
    pub id: OrderItemId,
    /// Owning order.
    pub order_id: OrderId,
    /// Product purchased.
    pub product_id: ProductId,
    /// Product title at checkout time.
    pub title: String,
    /// Unit price at checkout time.
    pub unit_price: Decimal,
    /// Units purchased.
    pub quantity: i32,
    /// `unit_price * quantity`.
    pub line_total: Decimal,
}

/// A local payment record mirroring a gateway payment intent.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    /// Unique payment ID.
    pub id: PaymentId,
    /// Order this payment settles.
    pub order_id: OrderId,
    /// Gateway name; currently always "stripe".
    pub provider: String,
    /// Gateway payment-intent identifier.
    pub intent_id: String,
    /// Local status, updated from webhooks and reconciliation.
    pub status: PaymentStatus,
    /// Charged amount in the major currency unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Email the gateway receipt goes to (guest checkouts).
    pub receipt_email: Option<String>,
    /// When the payment record was created.
    pub created_at: DateTime<Utc>,
    /// When the payment record was last updated.
    pub updated_at: DateTime<Utc>,
}
