//! Stripe REST API client.
//!
//! A thin, typed client over the endpoints this marketplace actually uses:
//! creating and retrieving payment intents and retrieving invoices. Writes
//! are form-encoded and reads are JSON, per Stripe's API conventions.

pub mod types;
pub mod webhook;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::config::StripeConfig;

pub use types::{Charge, Expandable, Invoice, PaymentIntent};
pub use webhook::{WebhookError, verify_signature};

const DEFAULT_API_BASE: &str = "https://api.stripe.com/v1";

/// Errors returned by the Stripe client.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Transport-level failure (connect, timeout, decode).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error object.
    #[error("stripe api error ({status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Human-readable message from Stripe.
        message: String,
    },
}

/// Error body shape returned by Stripe on non-2xx responses.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Stripe API client.
///
/// Cheaply cloneable; the reqwest client and credentials live behind an `Arc`.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
    /// Webhook signing secret, when webhooks are configured.
    webhook_secret: Option<SecretString>,
}

impl StripeClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: &StripeConfig) -> Self {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Create a client against a non-default API base (tests point this at
    /// a local stub).
    #[must_use]
    pub fn with_api_base(config: &StripeConfig, api_base: &str) -> Self {
        Self {
            inner: Arc::new(StripeClientInner {
                client: reqwest::Client::new(),
                api_base: api_base.trim_end_matches('/').to_string(),
                secret_key: config.secret_key.clone(),
                webhook_secret: config.webhook_secret.clone(),
            }),
        }
    }

    /// The webhook signing secret, if configured.
    #[must_use]
    pub fn webhook_secret(&self) -> Option<&SecretString> {
        self.inner.webhook_secret.as_ref()
    }

    fn auth_headers(&self) -> Result<HeaderMap, StripeError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.inner.secret_key.expose_secret());
        let mut value = HeaderValue::from_str(&bearer).map_err(|_| StripeError::Api {
            status: 0,
            message: "secret key contains invalid header characters".to_string(),
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let message = response
            .json::<ApiErrorEnvelope>()
            .await
            .map(|envelope| {
                let body = envelope.error;
                body.message
                    .or(body.error_type)
                    .unwrap_or_else(|| "unknown error".to_string())
            })
            .unwrap_or_else(|_| "unreadable error body".to_string());

        Err(StripeError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Create a payment intent for an order.
    ///
    /// `amount_minor` is in the currency's smallest unit (cents).
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Http` on transport failure or
    /// `StripeError::Api` when Stripe rejects the request.
    #[instrument(skip(self), fields(order = order_number))]
    pub async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        order_number: &str,
        receipt_email: Option<&str>,
    ) -> Result<PaymentIntent, StripeError> {
        let amount = amount_minor.to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("amount", amount.as_str()),
            ("currency", currency),
            ("metadata[order_number]", order_number),
            ("automatic_payment_methods[enabled]", "true"),
        ];
        if let Some(email) = receipt_email {
            form.push(("receipt_email", email));
        }

        let response = self
            .inner
            .client
            .post(format!("{}/payment_intents", self.inner.api_base))
            .headers(self.auth_headers()?)
            .form(&form)
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Retrieve a payment intent with its latest charge expanded.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Http` on transport failure or
    /// `StripeError::Api` when Stripe rejects the request.
    #[instrument(skip(self))]
    pub async fn get_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, StripeError> {
        let response = self
            .inner
            .client
            .get(format!(
                "{}/payment_intents/{intent_id}",
                self.inner.api_base
            ))
            .headers(self.auth_headers()?)
            .query(&[("expand[]", "latest_charge")])
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Retrieve an invoice.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Http` on transport failure or
    /// `StripeError::Api` when Stripe rejects the request.
    #[instrument(skip(self))]
    pub async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, StripeError> {
        let response = self
            .inner
            .client
            .get(format!("{}/invoices/{invoice_id}", self.inner.api_base))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        Self::decode(response).await
    }
}
