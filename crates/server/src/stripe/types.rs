//! Typed subsets of Stripe API objects.
//!
//! Only the fields this marketplace reads are modeled; everything else in
//! the gateway's responses is ignored by serde.

use serde::Deserialize;

/// A field that Stripe returns either as a bare ID or as the expanded
/// object, depending on the request's `expand[]` parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    /// Bare object ID.
    Id(String),
    /// Expanded object.
    Object(Box<T>),
}

impl<T> Expandable<T> {
    /// The expanded object, if this field was expanded.
    #[must_use]
    pub fn object(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Object(object) => Some(object),
        }
    }

    /// The object ID, whether or not the field was expanded.
    #[must_use]
    pub fn id<'a>(&'a self, id_of: impl Fn(&'a T) -> &'a str) -> &'a str {
        match self {
            Self::Id(id) => id,
            Self::Object(object) => id_of(object),
        }
    }
}

/// A Stripe payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Intent ID ("pi_...").
    pub id: String,
    /// Intent lifecycle status (e.g. "succeeded", "processing").
    pub status: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO currency code.
    pub currency: String,
    /// Secret handed to the browser to confirm the payment.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Most recent charge; expanded when requested.
    #[serde(default)]
    pub latest_charge: Option<Expandable<Charge>>,
    /// Linked invoice ID, for subscription-style payments.
    #[serde(default)]
    pub invoice: Option<Expandable<Invoice>>,
    /// Email the gateway receipt goes to.
    #[serde(default)]
    pub receipt_email: Option<String>,
}

impl PaymentIntent {
    /// The receipt URL from the latest charge, when present.
    #[must_use]
    pub fn receipt_url(&self) -> Option<&str> {
        self.latest_charge
            .as_ref()
            .and_then(Expandable::object)
            .and_then(|charge| charge.receipt_url.as_deref())
    }

    /// The linked invoice ID, when present.
    #[must_use]
    pub fn invoice_id(&self) -> Option<&str> {
        self.invoice
            .as_ref()
            .map(|invoice| invoice.id(|object| object.id.as_str()))
    }
}

/// A Stripe charge.
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    /// Charge ID ("ch_...").
    pub id: String,
    /// Hosted receipt URL, absent for some payment methods.
    #[serde(default)]
    pub receipt_url: Option<String>,
}

/// A Stripe invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    /// Invoice ID ("in_...").
    pub id: String,
    /// Hosted invoice page URL.
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,
    /// Invoice status (e.g. "paid").
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_expanded_charge() {
        let json = r#"{
            "id": "pi_123",
            "status": "succeeded",
            "amount": 1999,
            "currency": "usd",
            "latest_charge": {"id": "ch_123", "receipt_url": "https://pay.stripe.com/receipts/abc"}
        }"#;

        let intent: PaymentIntent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            intent.receipt_url(),
            Some("https://pay.stripe.com/receipts/abc")
        );
        assert_eq!(intent.invoice_id(), None);
    }

    #[test]
    fn deserializes_unexpanded_charge_as_id() {
        let json = r#"{
            "id": "pi_123",
            "status": "processing",
            "amount": 500,
            "currency": "usd",
            "latest_charge": "ch_123",
            "invoice": "in_456"
        }"#;

        let intent: PaymentIntent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(intent.receipt_url(), None);
        assert_eq!(intent.invoice_id(), Some("in_456"));
    }

    #[test]
    fn missing_optional_fields_default_to_none() {
        let json = r#"{"id": "pi_1", "status": "succeeded", "amount": 1, "currency": "usd"}"#;
        let intent: PaymentIntent = serde_json::from_str(json).expect("deserialize");
        assert!(intent.latest_charge.is_none());
        assert!(intent.client_secret.is_none());
    }
}
