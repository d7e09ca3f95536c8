//! Payment reconciliation against the gateway.
//!
//! The admin transactions screen can cross-check a local payment record
//! against the gateway's view of the intent. When the gateway disagrees on
//! status, the local record is updated to match; amount mismatches are
//! reported but never rewritten, since the local amount is what the order
//! was priced at.

use serde::Serialize;
use tracing::instrument;

use portobello_core::{CurrencyCode, OrderStatus, PaymentId, PaymentStatus, Price};

use crate::db::{OrderRepository, PaymentRepository};
use crate::error::AppError;
use crate::models::Payment;
use crate::state::AppState;
use crate::stripe::PaymentIntent;

/// Comparison of a local payment record with the gateway intent.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub payment_id: PaymentId,
    pub intent_id: String,
    /// Local status before reconciliation.
    pub local_status: PaymentStatus,
    /// Raw status string reported by the gateway.
    pub gateway_status: String,
    pub local_amount_minor: i64,
    pub gateway_amount_minor: i64,
    pub status_matches: bool,
    pub amount_matches: bool,
    /// Status adopted from the gateway, when it disagreed and mapped onto a
    /// known local status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adopted_status: Option<PaymentStatus>,
}

/// Compare a payment row with its gateway intent.
///
/// # Errors
///
/// Returns `AppError::Internal` if the local amount cannot be expressed in
/// minor units (which would mean a corrupt row).
pub fn compare(payment: &Payment, intent: &PaymentIntent) -> Result<ReconcileReport, AppError> {
    let currency =
        CurrencyCode::parse(&payment.currency).unwrap_or_default();
    let local_amount_minor = Price::new(payment.amount, currency)
        .to_minor_units()
        .map_err(|e| AppError::Internal(format!("payment amount out of range: {e}")))?;

    let mapped = PaymentStatus::from_gateway(&intent.status);
    let status_matches = mapped == Some(payment.status);
    let adopted_status = match mapped {
        Some(status) if status != payment.status => Some(status),
        _ => None,
    };

    Ok(ReconcileReport {
        payment_id: payment.id,
        intent_id: payment.intent_id.clone(),
        local_status: payment.status,
        gateway_status: intent.status.clone(),
        local_amount_minor,
        gateway_amount_minor: intent.amount,
        status_matches,
        amount_matches: local_amount_minor == intent.amount,
        adopted_status,
    })
}

/// Reconcile one payment against the gateway and persist any status change.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the payment does not exist,
/// `AppError::StripeNotConfigured` when the gateway is absent, and gateway
/// or database errors from the lookups and update.
#[instrument(skip(state))]
pub async fn reconcile_payment(
    state: &AppState,
    payment_id: PaymentId,
) -> Result<ReconcileReport, AppError> {
    let payments = PaymentRepository::new(state.pool());

    let payment = payments
        .get_by_id(payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("payment {payment_id}")))?;

    let stripe = state.stripe().ok_or(AppError::StripeNotConfigured)?;
    let intent = stripe.get_payment_intent(&payment.intent_id).await?;

    let report = compare(&payment, &intent)?;

    if let Some(status) = report.adopted_status {
        payments.set_status(payment.id, status).await?;
        tracing::info!(
            payment = %payment.id,
            from = ?report.local_status,
            to = ?status,
            "reconciliation adopted gateway status"
        );

        // A payment that turns out to have succeeded moves its pending
        // order forward, same as the webhook path would have.
        if status == PaymentStatus::Succeeded {
            let orders = OrderRepository::new(state.pool());
            if let Some(order) = orders.get_by_id(payment.order_id).await?
                && order.status == OrderStatus::Pending
            {
                orders.set_status(order.id, OrderStatus::Paid).await?;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use portobello_core::OrderId;
    use rust_decimal::Decimal;

    fn payment(status: PaymentStatus, amount_cents: i64) -> Payment {
        Payment {
            id: PaymentId::new(1),
            order_id: OrderId::new(1),
            provider: "stripe".to_string(),
            intent_id: "pi_1".to_string(),
            status,
            amount: Decimal::new(amount_cents, 2),
            currency: "USD".to_string(),
            receipt_email: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn intent(status: &str, amount: i64) -> PaymentIntent {
        PaymentIntent {
            id: "pi_1".to_string(),
            status: status.to_string(),
            amount,
            currency: "usd".to_string(),
            client_secret: None,
            latest_charge: None,
            invoice: None,
            receipt_email: None,
        }
    }

    #[test]
    fn agreement_produces_clean_report() {
        let report = compare(&payment(PaymentStatus::Succeeded, 1999), &intent("succeeded", 1999))
            .expect("report");

        assert!(report.status_matches);
        assert!(report.amount_matches);
        assert!(report.adopted_status.is_none());
    }

    #[test]
    fn status_disagreement_adopts_gateway_status() {
        let report = compare(&payment(PaymentStatus::Pending, 1999), &intent("succeeded", 1999))
            .expect("report");

        assert!(!report.status_matches);
        assert_eq!(report.adopted_status, Some(PaymentStatus::Succeeded));
    }

    #[test]
    fn unknown_gateway_status_is_reported_but_not_adopted() {
        let report = compare(
            &payment(PaymentStatus::Pending, 1999),
            &intent("some_future_state", 1999),
        )
        .expect("report");

        assert!(!report.status_matches);
        assert!(report.adopted_status.is_none());
        assert_eq!(report.gateway_status, "some_future_state");
    }

    #[test]
    fn amount_mismatch_is_flagged() {
        let report = compare(&payment(PaymentStatus::Succeeded, 1999), &intent("succeeded", 2099))
            .expect("report");

        assert!(report.status_matches);
        assert!(!report.amount_matches);
        assert_eq!(report.local_amount_minor, 1999);
        assert_eq!(report.gateway_amount_minor, 2099);
    }
}
