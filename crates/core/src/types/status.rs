//! Role and status enums shared across the marketplace.
//!
//! Each enum maps to a PostgreSQL enum type of the same (snake_case) name,
//! created by the server crate's migrations.

use serde::{Deserialize, Serialize};

/// Platform role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
pub enum UserRole {
    /// A shopper. The default for new registrations.
    #[default]
    Customer,
    /// A seller account that may own shops.
    Vendor,
    /// A platform operator.
    Admin,
}

impl UserRole {
    /// Stable string form used in APIs and the CLI.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
        }
    }

    /// Parse the string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "vendor" => Some(Self::Vendor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Tenant (shop) lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop_status", rename_all = "snake_case")
)]
pub enum ShopStatus {
    #[default]
    Active,
    Suspended,
}

/// Product visibility status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "snake_case")
)]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Fulfilled,
    Cancelled,
}

/// Local payment record status, mirroring the gateway's intent lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Map a gateway payment-intent status string onto the local status.
    ///
    /// Unknown gateway statuses map to `None` so callers can decide whether
    /// to leave the local record untouched.
    #[must_use]
    pub fn from_gateway(status: &str) -> Option<Self> {
        match status {
            "requires_payment_method" | "requires_confirmation" | "requires_action"
            | "requires_capture" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "succeeded" => Some(Self::Succeeded),
            "canceled" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Review moderation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "review_status", rename_all = "snake_case")
)]
pub enum ReviewStatus {
    #[default]
    Pending,
    Published,
    Rejected,
}

/// Coupon discount kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "coupon_kind", rename_all = "snake_case")
)]
pub enum CouponKind {
    /// `value` is a percentage of the subtotal (0-100).
    Percentage,
    /// `value` is a fixed amount in the order currency.
    Fixed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_string_roundtrip() {
        for role in [UserRole::Customer, UserRole::Vendor, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("superuser"), None);
    }

    #[test]
    fn gateway_status_mapping() {
        assert_eq!(
            PaymentStatus::from_gateway("succeeded"),
            Some(PaymentStatus::Succeeded)
        );
        assert_eq!(
            PaymentStatus::from_gateway("requires_action"),
            Some(PaymentStatus::Pending)
        );
        assert_eq!(
            PaymentStatus::from_gateway("canceled"),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(PaymentStatus::from_gateway("weird_new_state"), None);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Paid).expect("serialize");
        assert_eq!(json, "\"paid\"");
        let back: ReviewStatus = serde_json::from_str("\"published\"").expect("deserialize");
        assert_eq!(back, ReviewStatus::Published);
    }
}
