//! Integration tests for the Portobello marketplace server.
//!
//! # Running Tests
//!
//! ```bash
//! # Prepare the database and start the server
//! cargo run -p portobello-cli -- migrate
//! cargo run -p portobello-cli -- seed
//! cargo run -p portobello-server
//!
//! # Run the (ignored) network tests
//! cargo test -p portobello-integration-tests -- --ignored
//! ```
//!
//! Tests target the server at `PORTOBELLO_BASE_URL` (default
//! `http://localhost:3000`). Vendor- and admin-surface tests additionally
//! need `TEST_VENDOR_EMAIL`/`TEST_VENDOR_PASSWORD` and
//! `TEST_ADMIN_EMAIL`/`TEST_ADMIN_PASSWORD`; they skip themselves when the
//! credentials are absent.

use reqwest::Client;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("PORTOBELLO_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client with a cookie store, so sessions survive across requests.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique throwaway email for account-creating tests.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4())
}

/// Register a fresh customer account; the client's cookie store holds the
/// session afterwards.
///
/// # Panics
///
/// Panics if the request fails or registration is rejected.
pub async fn register(http: &Client, email: &str, password: &str) -> Value {
    let resp = http
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({
            "email": email,
            "password": password,
            "name": "Integration Test",
        }))
        .send()
        .await
        .expect("Failed to register");

    assert!(
        resp.status().is_success(),
        "registration failed: {}",
        resp.status()
    );
    resp.json().await.expect("Failed to parse registration response")
}

/// Log in with credentials taken from the environment. Returns `false`
/// (caller should skip) when the variables are unset or the login is
/// rejected, so the suite degrades gracefully on unprovisioned machines.
///
/// # Panics
///
/// Panics if the login request itself cannot be sent.
pub async fn login_from_env(http: &Client, email_var: &str, password_var: &str) -> bool {
    let (Ok(email), Ok(password)) = (std::env::var(email_var), std::env::var(password_var)) else {
        return false;
    };

    let resp = http
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    resp.status().is_success()
}
