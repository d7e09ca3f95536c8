//! Gateway webhook handlers.
//!
//! Stripe delivers payment lifecycle events here. Every delivery must carry
//! a valid signature; without a configured signing secret all deliveries
//! are rejected. Side effects past the status update (the confirmation
//! email) are best-effort and never fail the delivery.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use chrono::Utc;
use secrecy::ExposeSecret;

use portobello_core::{CurrencyCode, OrderStatus, PaymentStatus, Price};

use crate::db::{OrderRepository, PaymentRepository, ShopRepository, UserRepository};
use crate::error::AppError;
use crate::models::{Order, Payment};
use crate::services::email::OrderEmailLine;
use crate::state::AppState;
use crate::stripe::{self, webhook::Event};

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// Handle a signed Stripe event delivery.
///
/// # Errors
///
/// Returns `AppError::StripeNotConfigured` when the gateway or its signing
/// secret is absent, and `AppError::BadRequest` for deliveries that fail
/// signature verification.
async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let stripe = state.stripe().ok_or(AppError::StripeNotConfigured)?;
    let secret = stripe
        .webhook_secret()
        .ok_or(AppError::StripeNotConfigured)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing Stripe-Signature header".to_string()))?;

    let event = stripe::verify_signature(
        &body,
        signature,
        secret.expose_secret(),
        Utc::now().timestamp(),
    )
    .map_err(|e| AppError::BadRequest(format!("webhook rejected: {e}")))?;

    match event.event_type.as_str() {
        "payment_intent.succeeded" => intent_succeeded(&state, &event).await?,
        "payment_intent.payment_failed" => intent_failed(&state, &event).await?,
        other => {
            tracing::debug!(event = %event.id, event_type = other, "ignoring webhook event");
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}

fn intent_id_of(event: &Event) -> Result<&str, AppError> {
    event
        .data
        .object
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::BadRequest("event object has no intent id".to_string()))
}

/// A payment succeeded: mark the payment and its pending order, then send
/// the confirmation email.
async fn intent_succeeded(state: &AppState, event: &Event) -> Result<(), AppError> {
    let intent_id = intent_id_of(event)?;

    let Some(payment) = PaymentRepository::new(state.pool())
        .set_status_by_intent(intent_id, PaymentStatus::Succeeded)
        .await?
    else {
        // Stripe can replay events for intents this database never saw
        // (another environment, deleted data). Acknowledge and move on.
        tracing::warn!(intent = intent_id, "webhook for unknown payment intent");
        return Ok(());
    };

    let orders = OrderRepository::new(state.pool());
    let Some(order) = orders.get_by_id(payment.order_id).await? else {
        tracing::warn!(intent = intent_id, "payment has no order");
        return Ok(());
    };

    let order = if order.status == OrderStatus::Pending {
        orders.set_status(order.id, OrderStatus::Paid).await?
    } else {
        order
    };

    tracing::info!(order = %order.number, "payment succeeded");

    if let Err(e) = send_confirmation(state, &order, &payment).await {
        tracing::warn!(order = %order.number, error = %e, "confirmation email failed");
    }

    Ok(())
}

/// A payment failed: record it. The order stays pending so the customer
/// can retry with another payment method.
async fn intent_failed(state: &AppState, event: &Event) -> Result<(), AppError> {
    let intent_id = intent_id_of(event)?;

    let payment = PaymentRepository::new(state.pool())
        .set_status_by_intent(intent_id, PaymentStatus::Failed)
        .await?;

    match payment {
        Some(payment) => {
            tracing::info!(order = %payment.order_id, intent = intent_id, "payment failed");
        }
        None => {
            tracing::warn!(intent = intent_id, "webhook for unknown payment intent");
        }
    }

    Ok(())
}

/// Send the order confirmation email to whoever placed the order.
async fn send_confirmation(
    state: &AppState,
    order: &Order,
    payment: &Payment,
) -> Result<(), AppError> {
    let Some(email) = state.email() else {
        return Ok(());
    };

    let recipient = match (&order.guest_email, order.user_id) {
        (Some(guest), _) => Some(guest.clone()),
        (None, Some(user_id)) => UserRepository::new(state.pool())
            .get_by_id(user_id)
            .await?
            .map(|user| user.email.as_str().to_string()),
        (None, None) => None,
    };
    let Some(recipient) = recipient.or_else(|| payment.receipt_email.clone()) else {
        return Ok(());
    };

    let shop = ShopRepository::new(state.pool())
        .get_by_id(order.shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop {}", order.shop_id)))?;

    let currency = CurrencyCode::parse(&order.currency).unwrap_or_default();
    let lines: Vec<OrderEmailLine> = OrderRepository::new(state.pool())
        .items(order.id)
        .await?
        .into_iter()
        .map(|item| OrderEmailLine {
            title: item.title,
            quantity: item.quantity,
            line_total: Price::new(item.line_total, currency).display(),
        })
        .collect();
    let total = Price::new(order.total, currency).display();

    email
        .send_order_confirmation(&recipient, &order.number, &shop.name, &lines, &total)
        .await
        .map_err(|e| AppError::Internal(format!("email send failed: {e}")))?;

    Ok(())
}
