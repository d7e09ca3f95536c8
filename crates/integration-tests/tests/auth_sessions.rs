//! Integration tests for registration, login, and sessions.
//!
//! These tests require a running marketplace server and database:
//!
//! ```bash
//! cargo run -p portobello-cli -- migrate
//! cargo run -p portobello-server
//! cargo test -p portobello-integration-tests -- --ignored
//! ```

use portobello_core::UserRole;
use portobello_integration_tests::{base_url, client, register, unique_email};
use reqwest::StatusCode;
use serde_json::{Value, json};

const PASSWORD: &str = "integration-test-pass";

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn register_starts_a_session() {
    let http = client();
    let email = unique_email("register");

    let body = register(&http, &email, PASSWORD).await;
    assert_eq!(body.get("email").and_then(Value::as_str), Some(email.as_str()));

    // New accounts are customers; role escalation is admin-only.
    let role: UserRole =
        serde_json::from_value(body.get("role").cloned().expect("role field"))
            .expect("role parses");
    assert_eq!(role, UserRole::Customer);

    // The session cookie from registration authenticates /auth/me.
    let resp = http
        .get(format!("{}/auth/me", base_url()))
        .send()
        .await
        .expect("Failed to fetch /auth/me");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn duplicate_registration_conflicts() {
    let http = client();
    let email = unique_email("duplicate");

    register(&http, &email, PASSWORD).await;

    let resp = http
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({ "email": email, "password": PASSWORD, "name": "Again" }))
        .send()
        .await
        .expect("Failed to send second registration");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn weak_passwords_are_rejected() {
    let http = client();

    let resp = http
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({
            "email": unique_email("weak"),
            "password": "short",
            "name": "Weak",
        }))
        .send()
        .await
        .expect("Failed to send registration");
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn bad_credentials_are_unauthorized() {
    let http = client();
    let email = unique_email("badlogin");

    register(&http, &email, PASSWORD).await;

    let resp = http
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": "not-the-password" }))
        .send()
        .await
        .expect("Failed to send login");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn logout_ends_the_session() {
    let http = client();
    let email = unique_email("logout");

    register(&http, &email, PASSWORD).await;

    let resp = http
        .post(format!("{}/auth/logout", base_url()))
        .send()
        .await
        .expect("Failed to logout");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = http
        .get(format!("{}/auth/me", base_url()))
        .send()
        .await
        .expect("Failed to fetch /auth/me");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
