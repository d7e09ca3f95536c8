//! Tax rate and coupon domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use portobello_core::{CouponId, CouponKind, ShopId, TaxRateId};

/// An admin-managed tax rate.
///
/// Resolution prefers a (country, region) row over a country-wide row
/// (region `NULL`).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaxRate {
    /// Unique tax rate ID.
    pub id: TaxRateId,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    /// Region/state code; `None` means the rate covers the whole country.
    pub region: Option<String>,
    /// Percentage rate (e.g. 8.25 for 8.25%).
    pub rate: Decimal,
    /// Whether prices already include this tax.
    pub inclusive: bool,
    /// Inactive rates are ignored at checkout.
    pub active: bool,
    /// When the rate was created.
    pub created_at: DateTime<Utc>,
    /// When the rate was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A discount coupon.
///
/// Shop-scoped when `shop_id` is set, platform-wide otherwise.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    /// Unique coupon ID.
    pub id: CouponId,
    /// Owning shop; `None` for platform-wide coupons.
    pub shop_id: Option<ShopId>,
    /// Customer-facing code, unique within its scope.
    pub code: String,
    /// Percentage or fixed-amount discount.
    pub kind: CouponKind,
    /// Percentage (0-100) or fixed amount, depending on `kind`.
    pub value: Decimal,
    /// When the coupon becomes redeemable.
    pub starts_at: DateTime<Utc>,
    /// When the coupon expires; `None` means no expiry.
    pub ends_at: Option<DateTime<Utc>>,
    /// Maximum redemptions; `None` means unlimited.
    pub usage_limit: Option<i32>,
    /// Redemptions so far.
    pub times_used: i32,
    /// Inactive coupons are never redeemable.
    pub active: bool,
    /// When the coupon was created.
    pub created_at: DateTime<Utc>,
    /// When the coupon was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Whether the coupon can be redeemed at `now`.
    ///
    /// Checks the active flag, validity window, and usage limit. It does
    /// not check shop scope; callers match `shop_id` themselves.
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if now < self.starts_at {
            return false;
        }
        if self.ends_at.is_some_and(|ends| now >= ends) {
            return false;
        }
        if self
            .usage_limit
            .is_some_and(|limit| self.times_used >= limit)
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use portobello_core::CouponId;

    fn coupon(starts: i64, ends: Option<i64>, limit: Option<i32>, used: i32) -> Coupon {
        let ts = |secs| Utc.timestamp_opt(secs, 0).single().expect("valid ts");
        Coupon {
            id: CouponId::new(1),
            shop_id: None,
            code: "WELCOME10".to_string(),
            kind: CouponKind::Percentage,
            value: Decimal::new(10, 0),
            starts_at: ts(starts),
            ends_at: ends.map(ts),
            usage_limit: limit,
            times_used: used,
            active: true,
            created_at: ts(0),
            updated_at: ts(0),
        }
    }

    #[test]
    fn redeemable_inside_window() {
        let now = Utc.timestamp_opt(500, 0).single().expect("valid ts");
        assert!(coupon(100, Some(1000), None, 0).is_redeemable(now));
    }

    #[test]
    fn not_redeemable_before_start_or_after_end() {
        let now = Utc.timestamp_opt(50, 0).single().expect("valid ts");
        assert!(!coupon(100, None, None, 0).is_redeemable(now));

        let now = Utc.timestamp_opt(1000, 0).single().expect("valid ts");
        assert!(!coupon(100, Some(1000), None, 0).is_redeemable(now));
    }

    #[test]
    fn not_redeemable_when_usage_limit_reached() {
        let now = Utc.timestamp_opt(500, 0).single().expect("valid ts");
        assert!(!coupon(100, None, Some(3), 3).is_redeemable(now));
        assert!(coupon(100, None, Some(3), 2).is_redeemable(now));
    }

    #[test]
    fn not_redeemable_when_inactive() {
        let now = Utc.timestamp_opt(500, 0).single().expect("valid ts");
        let mut c = coupon(100, None, None, 0);
        c.active = false;
        assert!(!c.is_redeemable(now));
    }
}
