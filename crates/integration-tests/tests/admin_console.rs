//! Integration tests for the admin console.
//!
//! These tests log in with `TEST_ADMIN_EMAIL` / `TEST_ADMIN_PASSWORD`
//! (create one with `portobello admin create`) and skip themselves when
//! the credentials are absent.

use portobello_integration_tests::{base_url, client, login_from_env, register, unique_email};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

async fn admin_client() -> Option<Client> {
    let http = client();
    login_from_env(&http, "TEST_ADMIN_EMAIL", "TEST_ADMIN_PASSWORD")
        .await
        .then_some(http)
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn anonymous_callers_are_rejected() {
    let http = client();

    for path in ["/admin/tenants", "/admin/users", "/admin/transactions"] {
        let resp = http
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to request admin route");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "for {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running marketplace server and database"]
async fn customers_are_forbidden() {
    let http = client();
    register(&http, &unique_email("notadmin"), "integration-test-pass").await;

    let resp = http
        .get(format!("{}/admin/users", base_url()))
        .send()
        .await
        .expect("Failed to request admin route");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and admin credentials"]
async fn tenant_and_user_lists_paginate() {
    let Some(http) = admin_client().await else {
        return; // no admin credentials provisioned
    };

    let resp = http
        .get(format!("{}/admin/tenants?limit=5", base_url()))
        .send()
        .await
        .expect("Failed to list tenants");
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = resp.json().await.expect("Failed to parse tenants");
    assert_eq!(page.get("limit").and_then(Value::as_i64), Some(5));

    let resp = http
        .get(format!("{}/admin/users?role=vendor", base_url()))
        .send()
        .await
        .expect("Failed to list users");
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = resp.json().await.expect("Failed to parse users");
    for user in page.get("items").and_then(Value::as_array).expect("items") {
        assert_eq!(user.get("role").and_then(Value::as_str), Some("vendor"));
    }
}

#[tokio::test]
#[ignore = "Requires running marketplace server and admin credentials"]
async fn role_changes_take_effect() {
    let Some(admin) = admin_client().await else {
        return;
    };

    // Register a fresh customer with a separate client.
    let customer = client();
    let email = unique_email("promotee");
    let created = register(&customer, &email, "integration-test-pass").await;
    let user_id = created.get("id").and_then(Value::as_i64).expect("user id");

    let resp = admin
        .patch(format!("{}/admin/users/{user_id}/role", base_url()))
        .json(&json!({ "role": "vendor" }))
        .send()
        .await
        .expect("Failed to change role");
    assert_eq!(resp.status(), StatusCode::OK);

    // The promoted account can now reach the vendor surface without
    // logging in again.
    let resp = customer
        .get(format!("{}/vendor/shops", base_url()))
        .send()
        .await
        .expect("Failed to request vendor shops");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and admin credentials"]
async fn tax_rate_lifecycle() {
    let Some(http) = admin_client().await else {
        return;
    };

    // A random region keeps re-runs from tripping the uniqueness index.
    let region: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();

    let resp = http
        .post(format!("{}/admin/tax-rates", base_url()))
        .json(&json!({
            "country": "zz",
            "region": region,
            "rate": "8.25",
        }))
        .send()
        .await
        .expect("Failed to create tax rate");
    assert_eq!(resp.status(), StatusCode::OK);

    let rate: Value = resp.json().await.expect("Failed to parse tax rate");
    // Country codes are normalized to uppercase on the way in.
    assert_eq!(rate.get("country").and_then(Value::as_str), Some("ZZ"));
    let rate_id = rate.get("id").and_then(Value::as_i64).expect("rate id");

    let resp = http
        .patch(format!("{}/admin/tax-rates/{rate_id}", base_url()))
        .json(&json!({ "rate": "9.00", "inclusive": true }))
        .send()
        .await
        .expect("Failed to update tax rate");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = http
        .delete(format!("{}/admin/tax-rates/{rate_id}", base_url()))
        .send()
        .await
        .expect("Failed to delete tax rate");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and admin credentials"]
async fn out_of_range_tax_rates_are_rejected() {
    let Some(http) = admin_client().await else {
        return;
    };

    let resp = http
        .post(format!("{}/admin/tax-rates", base_url()))
        .json(&json!({ "country": "ZZ", "rate": "150" }))
        .send()
        .await
        .expect("Failed to send tax rate");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and admin credentials"]
async fn review_queue_defaults_to_pending() {
    let Some(http) = admin_client().await else {
        return;
    };

    let resp = http
        .get(format!("{}/admin/reviews", base_url()))
        .send()
        .await
        .expect("Failed to list reviews");
    assert_eq!(resp.status(), StatusCode::OK);

    let page: Value = resp.json().await.expect("Failed to parse reviews");
    for review in page.get("items").and_then(Value::as_array).expect("items") {
        assert_eq!(
            review.get("status").and_then(Value::as_str),
            Some("pending")
        );
    }
}

#[tokio::test]
#[ignore = "Requires running marketplace server and admin credentials"]
async fn transactions_list_and_missing_reconcile_target() {
    let Some(http) = admin_client().await else {
        return;
    };

    let resp = http
        .get(format!("{}/admin/transactions", base_url()))
        .send()
        .await
        .expect("Failed to list transactions");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = http
        .post(format!(
            "{}/admin/transactions/999999999/reconcile",
            base_url()
        ))
        .send()
        .await
        .expect("Failed to send reconcile");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
