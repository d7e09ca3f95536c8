//! Stripe webhook signature verification.
//!
//! Stripe signs deliveries with an HMAC-SHA256 over `"{timestamp}.{payload}"`
//! using the endpoint's signing secret, and sends the result in the
//! `Stripe-Signature` header as `t=<unix>,v1=<hex>[,v1=<hex>...]`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed age of a signed delivery, in seconds.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Errors raised while verifying a webhook delivery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    /// The `Stripe-Signature` header is missing or malformed.
    #[error("malformed signature header")]
    MalformedHeader,
    /// The delivery timestamp is outside the tolerance window.
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,
    /// No candidate signature matched the payload.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// The event payload is not valid JSON of the expected shape.
    #[error("unparseable event payload: {0}")]
    BadPayload(String),
}

/// A webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct Event {
    /// Event ID ("evt_...").
    pub id: String,
    /// Event type (e.g. "payment_intent.succeeded").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    pub data: EventData,
}

/// Payload wrapper inside an event.
#[derive(Debug, Deserialize)]
pub struct EventData {
    /// The API object the event describes, left untyped until the event
    /// type is known.
    pub object: serde_json::Value,
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or(WebhookError::MalformedHeader)?;
        match key {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| WebhookError::MalformedHeader)?);
            }
            "v1" => signatures.push(value.to_string()),
            // Ignore v0 and any future scheme identifiers.
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Verify a webhook delivery's signature and parse the event.
///
/// `now` is the current unix timestamp; deliveries older (or newer) than
/// five minutes are rejected before any HMAC work.
///
/// # Errors
///
/// Returns a [`WebhookError`] describing why the delivery was rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<Event, WebhookError> {
    let parsed = parse_header(header)?;

    if (now - parsed.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(WebhookError::StaleTimestamp);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::MalformedHeader)?;
    mac.update(parsed.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    serde_json::from_slice(payload).map_err(|e| WebhookError::BadPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_8f3kz0q2";

    fn sign(payload: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).expect("hmac key");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    const PAYLOAD: &str = r#"{
        "id": "evt_1",
        "type": "payment_intent.succeeded",
        "data": {"object": {"id": "pi_123", "status": "succeeded"}}
    }"#;

    #[test]
    fn accepts_valid_signature() {
        let now = 1_750_000_000;
        let header = format!("t={now},v1={}", sign(PAYLOAD, now));

        let event =
            verify_signature(PAYLOAD.as_bytes(), &header, SECRET, now).expect("valid delivery");
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object["id"], "pi_123");
    }

    #[test]
    fn accepts_valid_signature_among_multiple_candidates() {
        let now = 1_750_000_000;
        let header = format!("t={now},v1={},v1={}", "ab".repeat(32), sign(PAYLOAD, now));

        assert!(verify_signature(PAYLOAD.as_bytes(), &header, SECRET, now).is_ok());
    }

    #[test]
    fn rejects_wrong_signature() {
        let now = 1_750_000_000;
        let header = format!("t={now},v1={}", "ab".repeat(32));

        assert!(matches!(
            verify_signature(PAYLOAD.as_bytes(), &header, SECRET, now),
            Err(WebhookError::SignatureMismatch)
        ));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let signed_at = 1_750_000_000;
        let header = format!("t={signed_at},v1={}", sign(PAYLOAD, signed_at));

        assert!(matches!(
            verify_signature(PAYLOAD.as_bytes(), &header, SECRET, signed_at + 301),
            Err(WebhookError::StaleTimestamp)
        ));
    }

    #[test]
    fn rejects_malformed_header() {
        let now = 1_750_000_000;
        assert!(matches!(
            verify_signature(PAYLOAD.as_bytes(), "not-a-header", SECRET, now),
            Err(WebhookError::MalformedHeader)
        ));
        assert!(matches!(
            verify_signature(PAYLOAD.as_bytes(), "t=123", SECRET, now),
            Err(WebhookError::MalformedHeader)
        ));
    }

    #[test]
    fn rejects_tampered_payload() {
        let now = 1_750_000_000;
        let header = format!("t={now},v1={}", sign(PAYLOAD, now));
        let tampered = PAYLOAD.replace("pi_123", "pi_999");

        assert!(matches!(
            verify_signature(tampered.as_bytes(), &header, SECRET, now),
            Err(WebhookError::SignatureMismatch)
        ));
    }
}
