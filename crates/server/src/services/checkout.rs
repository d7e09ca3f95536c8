//! Checkout: turn a cart into an order, a payment intent, and a local
//! payment record.
//!
//! Carts are priced from the database, never from the client. The order,
//! its line item snapshots, the inventory reservation, and any coupon
//! redemption commit in one transaction; the gateway intent is created
//! after the commit, so a gateway failure leaves a pending order with no
//! payment rather than a charge with no order.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::instrument;

use portobello_core::{
    CouponKind, CurrencyCode, Email, Price, ProductId, ProductStatus, ShippingMethodId, ShopStatus,
};

use crate::db::orders::{CreateOrder, CreateOrderItem};
use crate::db::{
    CouponRepository, OrderRepository, PaymentRepository, ProductRepository, RepositoryError,
    ShippingRepository, ShopRepository, TaxRateRepository,
};
use crate::error::AppError;
use crate::models::{Coupon, CurrentUser, Order, OrderItem, Product, TaxRate};
use crate::services::shipping::{self, eligible_methods, restriction_map, single_shop};
use crate::state::AppState;

/// Characters used in the random order-number suffix. Ambiguous glyphs
/// (0/O, 1/I/L) are excluded.
const NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const NUMBER_SUFFIX_LEN: usize = 6;

/// One requested cart line.
#[derive(Debug, Clone, Copy)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Checkout request after DTO validation.
#[derive(Debug)]
pub struct CheckoutInput {
    pub lines: Vec<CartLine>,
    pub shipping_method_id: ShippingMethodId,
    pub coupon_code: Option<String>,
    pub shipping_country: String,
    pub shipping_region: Option<String>,
    /// Contact email for guest checkouts; ignored for logged-in callers.
    pub guest_email: Option<String>,
}

/// A placed order with everything the storefront needs to confirm payment.
#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Gateway client secret the browser uses to confirm the intent.
    pub client_secret: Option<String>,
}

/// Order amount breakdown, all rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub tax_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
}

/// Merge duplicate product lines, summing quantities. Lines with a
/// non-positive quantity are dropped.
#[must_use]
pub fn merge_lines(lines: &[CartLine]) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::new();
    for line in lines {
        if line.quantity <= 0 {
            continue;
        }
        match merged
            .iter_mut()
            .find(|m| m.product_id == line.product_id)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(*line),
        }
    }
    merged
}

/// Discount a coupon takes off a subtotal, capped at the subtotal itself.
#[must_use]
pub fn discount_amount(kind: CouponKind, value: Decimal, subtotal: Decimal) -> Decimal {
    let raw = match kind {
        CouponKind::Percentage => subtotal * value / Decimal::ONE_HUNDRED,
        CouponKind::Fixed => value,
    };
    raw.min(subtotal)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax charged on a taxable amount.
///
/// Exclusive rates add on top; inclusive rates back the tax share out of
/// prices that already contain it. Either way the return value lands in
/// `tax_total`; only exclusive tax is added to the grand total.
#[must_use]
pub fn tax_amount(rate: Decimal, inclusive: bool, taxable: Decimal) -> Decimal {
    let factor = rate / Decimal::ONE_HUNDRED;
    let raw = if inclusive {
        taxable - taxable / (Decimal::ONE + factor)
    } else {
        taxable * factor
    };
    raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute an order's amount breakdown.
#[must_use]
pub fn compute_totals(
    subtotal: Decimal,
    coupon: Option<&Coupon>,
    tax_rate: Option<&TaxRate>,
    shipping_rate: Decimal,
) -> OrderTotals {
    let discount_total =
        coupon.map_or(Decimal::ZERO, |c| discount_amount(c.kind, c.value, subtotal));
    let taxable = subtotal - discount_total;

    let (tax_total, tax_added) = match tax_rate {
        Some(rate) => {
            let amount = tax_amount(rate.rate, rate.inclusive, taxable);
            let added = if rate.inclusive { Decimal::ZERO } else { amount };
            (amount, added)
        }
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    OrderTotals {
        subtotal,
        discount_total,
        tax_total,
        shipping_total: shipping_rate,
        total: taxable + tax_added + shipping_rate,
    }
}

/// Generate a human-facing order number, e.g. "PB-20260412-7F3KQM".
fn order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..NUMBER_SUFFIX_LEN)
        .filter_map(|_| NUMBER_ALPHABET.choose(&mut rng))
        .map(|&b| b as char)
        .collect();
    format!("PB-{}-{suffix}", now.format("%Y%m%d"))
}

/// Place an order for a single-shop cart.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for carts that are empty, span shops, mix
/// currencies, reference unavailable products, or pick an ineligible
/// shipping method or unredeemable coupon; `AppError::StripeNotConfigured`
/// when the gateway is absent; `AppError::Conflict` when stock or a coupon's
/// usage limit runs out; and database or gateway errors from the writes.
#[instrument(skip(state, caller, input), fields(lines = input.lines.len()))]
pub async fn place_order(
    state: &AppState,
    caller: Option<&CurrentUser>,
    input: CheckoutInput,
) -> Result<CheckoutOutcome, AppError> {
    let lines = merge_lines(&input.lines);
    if lines.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    // Resolve who the order belongs to before touching any data.
    let guest_email = match caller {
        Some(_) => None,
        None => {
            let email = input.guest_email.as_deref().ok_or_else(|| {
                AppError::BadRequest("guest checkout requires an email".to_string())
            })?;
            let parsed = Email::parse(email)
                .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;
            Some(parsed.as_str().to_string())
        }
    };

    // Gateway availability is checked before any writes happen.
    let stripe = state.stripe().ok_or(AppError::StripeNotConfigured)?;

    let ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    if products.len() != ids.len() {
        return Err(AppError::NotFound("product in cart".to_string()));
    }
    for product in &products {
        if product.status != ProductStatus::Active {
            return Err(AppError::BadRequest(format!(
                "product '{}' is not available",
                product.title
            )));
        }
    }

    let Some(shop_id) = single_shop(&products) else {
        return Err(AppError::BadRequest(
            "cart spans multiple shops; place one order per shop".to_string(),
        ));
    };

    let shop = ShopRepository::new(state.pool())
        .get_by_id(shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop {shop_id}")))?;
    if shop.status != ShopStatus::Active {
        return Err(AppError::BadRequest(
            "this shop is not accepting orders".to_string(),
        ));
    }

    let currency = currency_of(&products)?;

    // The chosen method must survive the cart-wide eligibility filter.
    let methods = shipping::active_methods_cached(state, shop_id).await?;
    let rows = ShippingRepository::new(state.pool())
        .restrictions_for_products(&ids)
        .await?;
    let eligible = eligible_methods(methods.as_ref().clone(), &restriction_map(&rows));
    let method = eligible
        .into_iter()
        .find(|m| m.id == input.shipping_method_id)
        .ok_or_else(|| {
            AppError::BadRequest("shipping method is not available for this cart".to_string())
        })?;

    let now = Utc::now();

    let coupon = match input.coupon_code.as_deref() {
        Some(code) => {
            let coupon = CouponRepository::new(state.pool())
                .find_for_redemption(code, shop_id)
                .await?
                .filter(|c| c.is_redeemable(now))
                .ok_or_else(|| {
                    AppError::BadRequest("coupon code cannot be redeemed".to_string())
                })?;
            Some(coupon)
        }
        None => None,
    };

    let tax_rate = TaxRateRepository::new(state.pool())
        .resolve(&input.shipping_country, input.shipping_region.as_deref())
        .await?;

    let priced: Vec<(&Product, i32, Decimal)> = lines
        .iter()
        .map(|line| {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| AppError::Internal("cart line lost its product".to_string()))?;
            let line_total = product.price * Decimal::from(line.quantity);
            Ok((product, line.quantity, line_total))
        })
        .collect::<Result<_, AppError>>()?;
    let subtotal: Decimal = priced.iter().map(|(_, _, line_total)| *line_total).sum();

    let totals = compute_totals(subtotal, coupon.as_ref(), tax_rate.as_ref(), method.rate);

    // Everything that must hold together holds together: stock, the order
    // header, line snapshots, and the coupon redemption.
    let mut tx = state.pool().begin().await.map_err(RepositoryError::Database)?;

    let order_repo = OrderRepository::new(state.pool());
    let product_repo = ProductRepository::new(state.pool());

    for (product, quantity, _) in &priced {
        product_repo
            .reserve_inventory(&mut tx, product.id, *quantity)
            .await?;
    }

    let order = order_repo
        .insert(
            &mut tx,
            CreateOrder {
                number: &order_number(now),
                user_id: caller.map(|user| user.id),
                guest_email: guest_email.as_deref(),
                shop_id,
                currency: currency.as_str(),
                subtotal: totals.subtotal,
                discount_total: totals.discount_total,
                tax_total: totals.tax_total,
                shipping_total: totals.shipping_total,
                total: totals.total,
                shipping_method_id: method.id,
                coupon_id: coupon.as_ref().map(|c| c.id),
                shipping_country: &input.shipping_country,
                shipping_region: input.shipping_region.as_deref(),
            },
        )
        .await?;

    let item_params: Vec<CreateOrderItem<'_>> = priced
        .iter()
        .map(|(product, quantity, line_total)| CreateOrderItem {
            product_id: product.id,
            title: &product.title,
            unit_price: product.price,
            quantity: *quantity,
            line_total: *line_total,
        })
        .collect();
    let items = order_repo.insert_items(&mut tx, order.id, &item_params).await?;

    if let Some(coupon) = &coupon {
        CouponRepository::new(state.pool())
            .record_redemption(&mut tx, coupon.id)
            .await?;
    }

    tx.commit().await.map_err(RepositoryError::Database)?;

    let receipt_email = guest_email
        .clone()
        .or_else(|| caller.map(|user| user.email.as_str().to_string()));

    let amount_minor = Price::new(totals.total, currency)
        .to_minor_units()
        .map_err(|e| AppError::Internal(format!("order total out of range: {e}")))?;

    let intent = stripe
        .create_payment_intent(
            amount_minor,
            currency.gateway_code(),
            &order.number,
            receipt_email.as_deref(),
        )
        .await?;

    PaymentRepository::new(state.pool())
        .create(
            order.id,
            &intent.id,
            totals.total,
            currency.as_str(),
            receipt_email.as_deref(),
        )
        .await?;

    Ok(CheckoutOutcome {
        order,
        items,
        client_secret: intent.client_secret,
    })
}

/// The single currency shared by every product in the cart.
fn currency_of(products: &[Product]) -> Result<CurrencyCode, AppError> {
    let mut iter = products.iter();
    let first = iter
        .next()
        .ok_or_else(|| AppError::BadRequest("cart is empty".to_string()))?;
    if iter.any(|p| p.currency != first.currency) {
        return Err(AppError::BadRequest(
            "cart mixes currencies; place one order per currency".to_string(),
        ));
    }
    CurrencyCode::parse(&first.currency)
        .ok_or_else(|| AppError::Internal(format!("unsupported currency {}", first.currency)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use portobello_core::{CouponId, TaxRateId};

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn line(product: i64, quantity: i32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            quantity,
        }
    }

    fn percentage_coupon(value: Decimal) -> Coupon {
        let ts = Utc.timestamp_opt(0, 0).single().expect("valid ts");
        Coupon {
            id: CouponId::new(1),
            shop_id: None,
            code: "TEST".to_string(),
            kind: CouponKind::Percentage,
            value,
            starts_at: ts,
            ends_at: None,
            usage_limit: None,
            times_used: 0,
            active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn rate(percent: Decimal, inclusive: bool) -> TaxRate {
        let ts = Utc.timestamp_opt(0, 0).single().expect("valid ts");
        TaxRate {
            id: TaxRateId::new(1),
            country: "US".to_string(),
            region: None,
            rate: percent,
            inclusive,
            active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn merge_sums_duplicate_lines_and_drops_empty_ones() {
        let merged = merge_lines(&[line(1, 2), line(2, 1), line(1, 3), line(3, 0)]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product_id, ProductId::new(1));
        assert_eq!(merged[0].quantity, 5);
        assert_eq!(merged[1].quantity, 1);
    }

    #[test]
    fn percentage_discount_rounds_half_up() {
        // 10% of 10.05 = 1.005, rounds to 1.01.
        assert_eq!(
            discount_amount(CouponKind::Percentage, Decimal::new(10, 0), dec(1005)),
            dec(101)
        );
    }

    #[test]
    fn fixed_discount_is_capped_at_subtotal() {
        assert_eq!(
            discount_amount(CouponKind::Fixed, dec(5000), dec(1999)),
            dec(1999)
        );
        assert_eq!(
            discount_amount(CouponKind::Fixed, dec(500), dec(1999)),
            dec(500)
        );
    }

    #[test]
    fn exclusive_tax_adds_to_total() {
        let totals = compute_totals(
            dec(10000),                              // 100.00
            None,
            Some(&rate(Decimal::new(825, 2), false)), // 8.25%
            dec(500),                                // 5.00 shipping
        );

        assert_eq!(totals.tax_total, dec(825));
        assert_eq!(totals.total, dec(11325));
    }

    #[test]
    fn inclusive_tax_is_reported_but_not_added() {
        let totals = compute_totals(
            dec(12000), // 120.00 with 20% VAT inside
            None,
            Some(&rate(Decimal::new(20, 0), true)),
            Decimal::ZERO,
        );

        assert_eq!(totals.tax_total, dec(2000));
        assert_eq!(totals.total, dec(12000));
    }

    #[test]
    fn discount_applies_before_tax() {
        let totals = compute_totals(
            dec(10000),
            Some(&percentage_coupon(Decimal::new(10, 0))),
            Some(&rate(Decimal::new(10, 0), false)),
            Decimal::ZERO,
        );

        // 100 - 10 = 90 taxable, 10% tax = 9, total 99.
        assert_eq!(totals.discount_total, dec(1000));
        assert_eq!(totals.tax_total, dec(900));
        assert_eq!(totals.total, dec(9900));
    }

    #[test]
    fn no_tax_rate_means_zero_tax() {
        let totals = compute_totals(dec(5000), None, None, dec(499));
        assert_eq!(totals.tax_total, Decimal::ZERO);
        assert_eq!(totals.total, dec(5499));
    }

    #[test]
    fn order_numbers_carry_date_and_random_suffix() {
        let now = Utc.timestamp_opt(1_767_225_600, 0).single().expect("ts");
        let number = order_number(now);

        assert!(number.starts_with("PB-20260101-"));
        assert_eq!(number.len(), "PB-20260101-".len() + NUMBER_SUFFIX_LEN);
        assert_ne!(order_number(now), order_number(now));
    }
}
