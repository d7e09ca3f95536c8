//! Receipt and invoice resolution for orders.
//!
//! Finds a hosted receipt or invoice URL for a paid order. The caller is
//! authorized against local records first; the gateway is only contacted
//! for requests that pass.

use serde::Serialize;
use tracing::instrument;

use portobello_core::OrderId;

use crate::db::{OrderRepository, PaymentRepository};
use crate::error::AppError;
use crate::models::{CurrentUser, Order, Payment};
use crate::state::AppState;
use crate::stripe::{Invoice, PaymentIntent};

/// Guest credentials for receipt access: the contact email plus the
/// payment-intent ID from the checkout response.
#[derive(Debug, Clone)]
pub struct GuestReceiptAccess<'a> {
    pub email: &'a str,
    pub intent_id: &'a str,
}

/// What a receipt lookup resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    /// A charge receipt page.
    Receipt,
    /// A hosted invoice page.
    Invoice,
}

/// Response payload for a receipt lookup.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptResolution {
    pub order_id: OrderId,
    /// False when the gateway has neither a receipt nor an invoice URL.
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReceiptKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Decide whether a caller may see an order's receipt.
///
/// Access is granted to the order's owner, to a guest presenting the
/// matching email and intent ID, and to platform admins.
#[must_use]
pub fn authorize_receipt(
    order: &Order,
    payment: &Payment,
    caller: Option<&CurrentUser>,
    guest: Option<&GuestReceiptAccess<'_>>,
) -> bool {
    if let Some(user) = caller {
        if user.is_admin() {
            return true;
        }
        if order.user_id == Some(user.id) {
            return true;
        }
    }

    if let Some(guest) = guest {
        let email_matches = order
            .guest_email
            .as_deref()
            .or(payment.receipt_email.as_deref())
            .is_some_and(|email| email.eq_ignore_ascii_case(guest.email));
        if email_matches && payment.intent_id == guest.intent_id {
            return true;
        }
    }

    false
}

/// Pick the URL to hand back: a charge receipt when the intent has one,
/// otherwise the linked invoice's hosted page.
#[must_use]
pub fn resolve_receipt_url(
    intent: &PaymentIntent,
    invoice: Option<&Invoice>,
) -> Option<(ReceiptKind, String)> {
    if let Some(url) = intent.receipt_url() {
        return Some((ReceiptKind::Receipt, url.to_string()));
    }

    invoice
        .and_then(|invoice| invoice.hosted_invoice_url.clone())
        .map(|url| (ReceiptKind::Invoice, url))
}

/// Resolve a hosted receipt or invoice URL for an order.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the order or its payment is missing,
/// `AppError::Forbidden` for callers that fail the ownership check,
/// `AppError::StripeNotConfigured` when the gateway is absent, and gateway
/// errors from the remote lookups.
#[instrument(skip(state, caller, guest))]
pub async fn receipt_for_order(
    state: &AppState,
    order_id: OrderId,
    caller: Option<&CurrentUser>,
    guest: Option<GuestReceiptAccess<'_>>,
) -> Result<ReceiptResolution, AppError> {
    let order = OrderRepository::new(state.pool())
        .get_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    let payment = PaymentRepository::new(state.pool())
        .get_by_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("payment for order {order_id}")))?;

    // Ownership is decided from local records before any gateway traffic.
    if !authorize_receipt(&order, &payment, caller, guest.as_ref()) {
        return Err(AppError::Forbidden(
            "you do not have access to this receipt".to_string(),
        ));
    }

    let stripe = state.stripe().ok_or(AppError::StripeNotConfigured)?;

    let intent = stripe.get_payment_intent(&payment.intent_id).await?;

    let invoice = match intent.receipt_url() {
        // A direct receipt wins; skip the second lookup entirely.
        Some(_) => None,
        None => match intent.invoice_id() {
            Some(invoice_id) => Some(stripe.get_invoice(invoice_id).await?),
            None => None,
        },
    };

    let resolved = resolve_receipt_url(&intent, invoice.as_ref());
    let (kind, url) = match resolved {
        Some((kind, url)) => (Some(kind), Some(url)),
        None => (None, None),
    };

    Ok(ReceiptResolution {
        order_id,
        available: url.is_some(),
        kind,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use portobello_core::{
        Email, OrderStatus, PaymentId, PaymentStatus, ShippingMethodId, ShopId, UserId, UserRole,
    };
    use rust_decimal::Decimal;

    use crate::stripe::{Charge, Expandable};

    fn order(user_id: Option<i64>, guest_email: Option<&str>) -> Order {
        Order {
            id: OrderId::new(1),
            number: "PB-1001".to_string(),
            user_id: user_id.map(UserId::new),
            guest_email: guest_email.map(String::from),
            shop_id: ShopId::new(1),
            status: OrderStatus::Paid,
            currency: "USD".to_string(),
            subtotal: Decimal::new(1000, 2),
            discount_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            shipping_total: Decimal::ZERO,
            total: Decimal::new(1000, 2),
            shipping_method_id: ShippingMethodId::new(1),
            coupon_id: None,
            shipping_country: "US".to_string(),
            shipping_region: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payment(intent_id: &str, receipt_email: Option<&str>) -> Payment {
        Payment {
            id: PaymentId::new(1),
            order_id: OrderId::new(1),
            provider: "stripe".to_string(),
            intent_id: intent_id.to_string(),
            status: PaymentStatus::Succeeded,
            amount: Decimal::new(1000, 2),
            currency: "USD".to_string(),
            receipt_email: receipt_email.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(id: i64, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("user@example.com").expect("valid"),
            name: "Test User".to_string(),
            role,
        }
    }

    fn intent(receipt_url: Option<&str>, invoice_id: Option<&str>) -> PaymentIntent {
        PaymentIntent {
            id: "pi_1".to_string(),
            status: "succeeded".to_string(),
            amount: 1000,
            currency: "usd".to_string(),
            client_secret: None,
            latest_charge: Some(Expandable::Object(Box::new(Charge {
                id: "ch_1".to_string(),
                receipt_url: receipt_url.map(String::from),
            }))),
            invoice: invoice_id.map(|id| Expandable::Id(id.to_string())),
            receipt_email: None,
        }
    }

    #[test]
    fn owner_and_admin_are_authorized() {
        let order = order(Some(42), None);
        let payment = payment("pi_1", None);

        assert!(authorize_receipt(
            &order,
            &payment,
            Some(&user(42, UserRole::Customer)),
            None
        ));
        assert!(authorize_receipt(
            &order,
            &payment,
            Some(&user(7, UserRole::Admin)),
            None
        ));
        assert!(!authorize_receipt(
            &order,
            &payment,
            Some(&user(7, UserRole::Customer)),
            None
        ));
    }

    #[test]
    fn guest_needs_both_email_and_intent_to_match() {
        let order = order(None, Some("guest@example.com"));
        let payment = payment("pi_abc", None);

        let valid = GuestReceiptAccess {
            email: "Guest@Example.com",
            intent_id: "pi_abc",
        };
        assert!(authorize_receipt(&order, &payment, None, Some(&valid)));

        let wrong_intent = GuestReceiptAccess {
            email: "guest@example.com",
            intent_id: "pi_other",
        };
        assert!(!authorize_receipt(
            &order,
            &payment,
            None,
            Some(&wrong_intent)
        ));

        let wrong_email = GuestReceiptAccess {
            email: "other@example.com",
            intent_id: "pi_abc",
        };
        assert!(!authorize_receipt(
            &order,
            &payment,
            None,
            Some(&wrong_email)
        ));
    }

    #[test]
    fn anonymous_callers_are_rejected() {
        let order = order(Some(42), None);
        let payment = payment("pi_1", None);
        assert!(!authorize_receipt(&order, &payment, None, None));
    }

    #[test]
    fn receipt_url_wins_over_invoice() {
        let intent = intent(Some("https://pay.stripe.com/r/1"), Some("in_1"));
        let invoice = Invoice {
            id: "in_1".to_string(),
            hosted_invoice_url: Some("https://invoice.stripe.com/i/1".to_string()),
            status: Some("paid".to_string()),
        };

        let (kind, url) = resolve_receipt_url(&intent, Some(&invoice)).expect("resolved");
        assert_eq!(kind, ReceiptKind::Receipt);
        assert_eq!(url, "https://pay.stripe.com/r/1");
    }

    #[test]
    fn falls_back_to_hosted_invoice_url() {
        let intent = intent(None, Some("in_1"));
        let invoice = Invoice {
            id: "in_1".to_string(),
            hosted_invoice_url: Some("https://invoice.stripe.com/i/1".to_string()),
            status: Some("paid".to_string()),
        };

        let (kind, url) = resolve_receipt_url(&intent, Some(&invoice)).expect("resolved");
        assert_eq!(kind, ReceiptKind::Invoice);
        assert_eq!(url, "https://invoice.stripe.com/i/1");
    }

    #[test]
    fn reports_unavailable_when_neither_exists() {
        let intent = intent(None, None);
        assert!(resolve_receipt_url(&intent, None).is_none());
    }
}
