//! Per-IP rate limiting for the authentication endpoints.
//!
//! Login and registration are the only endpoints a password-guessing bot
//! cares about, so they are the only ones limited here; everything else is
//! left to the reverse proxy. The limiter keys on the client address taken
//! from the proxy's forwarding headers.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// How many attempts an IP can make back to back before throttling starts.
const AUTH_BURST: u32 = 8;

/// Seconds until a spent attempt is handed back. Eight up front plus one
/// every fifteen seconds covers a person re-typing a password several times;
/// a credential-stuffing run starves on it.
const AUTH_REFILL_SECS: u64 = 15;

/// Forwarding headers consulted for the real client address, in the order
/// our deploy targets populate them.
const FORWARD_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip", "fly-client-ip"];

/// Key extractor that trusts the reverse proxy's forwarding headers.
///
/// The raw socket address is useless behind a proxy (every request appears
/// to come from the proxy itself), so a request with no usable forwarding
/// header yields no key and is refused rather than pooled under one bucket.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        FORWARD_HEADERS
            .iter()
            .filter_map(|name| req.headers().get(*name))
            .filter_map(|value| value.to_str().ok())
            // X-Forwarded-For can carry a proxy chain; the leftmost entry
            // is the connecting client.
            .filter_map(|value| value.split(',').next())
            .find_map(|candidate| candidate.trim().parse::<IpAddr>().ok())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Build the limiter applied to `/auth` routes.
///
/// # Panics
///
/// Never in practice: `finish` only rejects zero-valued settings, and both
/// constants here are non-zero.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(AUTH_REFILL_SECS)
        .burst_size(AUTH_BURST)
        .finish()
        .expect("auth limiter settings are non-zero");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_governor::key_extractor::KeyExtractor;

    fn request_with(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).expect("request")
    }

    #[test]
    fn takes_the_leftmost_forwarded_address() {
        let req = request_with(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1, 10.0.0.2")]);
        let key = ProxyIpKeyExtractor.extract(&req).expect("key");
        assert_eq!(key, "203.0.113.9".parse::<IpAddr>().expect("ip"));
    }

    #[test]
    fn falls_through_to_later_headers() {
        let req = request_with(&[("x-real-ip", "198.51.100.4")]);
        let key = ProxyIpKeyExtractor.extract(&req).expect("key");
        assert_eq!(key, "198.51.100.4".parse::<IpAddr>().expect("ip"));
    }

    #[test]
    fn refuses_requests_with_no_usable_header() {
        let bare = request_with(&[]);
        assert!(ProxyIpKeyExtractor.extract(&bare).is_err());

        let garbage = request_with(&[("x-forwarded-for", "not-an-address")]);
        assert!(ProxyIpKeyExtractor.extract(&garbage).is_err());
    }
}
