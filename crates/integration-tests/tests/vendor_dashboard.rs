//! Integration tests for the vendor dashboard.
//!
//! These tests log in with `TEST_VENDOR_EMAIL` / `TEST_VENDOR_PASSWORD`
//! (an account already promoted to vendor, e.g. via
//! `portobello admin promote -r vendor`) and skip themselves when the
//! credentials are absent.

use portobello_integration_tests::{base_url, client, login_from_env, register, unique_email};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

async fn vendor_client() -> Option<Client> {
    let http = client();
    login_from_env(&http, "TEST_VENDOR_EMAIL", "TEST_VENDOR_PASSWORD")
        .await
        .then_some(http)
}

/// Create a throwaway shop and return its id.
async fn create_shop(http: &Client) -> i64 {
    let slug = format!("it-shop-{}", Uuid::new_v4().simple());
    let resp = http
        .post(format!("{}/vendor/shops", base_url()))
        .json(&json!({ "name": "Integration Shop", "slug": slug }))
        .send()
        .await
        .expect("Failed to create shop");
    assert_eq!(resp.status(), StatusCode::OK);

    let shop: Value = resp.json().await.expect("Failed to parse shop");
    shop.get("id").and_then(Value::as_i64).expect("shop id")
}

#[tokio::test]
#[ignore = "Requires running marketplace server and vendor credentials"]
async fn customers_cannot_reach_the_vendor_surface() {
    let http = client();
    register(&http, &unique_email("customer"), "integration-test-pass").await;

    let resp = http
        .get(format!("{}/vendor/shops", base_url()))
        .send()
        .await
        .expect("Failed to request vendor shops");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and vendor credentials"]
async fn vendor_creates_shop_and_product() {
    let Some(http) = vendor_client().await else {
        return; // no vendor credentials provisioned
    };

    let shop_id = create_shop(&http).await;

    let resp = http
        .post(format!("{}/vendor/shops/{shop_id}/products", base_url()))
        .json(&json!({
            "title": "Integration Widget",
            "description": "Created by the integration suite.",
            "price": "12.50",
            "inventory": 3,
        }))
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status(), StatusCode::OK);

    let product: Value = resp.json().await.expect("Failed to parse product");
    // New products start as drafts and stay off the storefront until
    // the vendor activates them.
    assert_eq!(product.get("status").and_then(Value::as_str), Some("draft"));

    let product_id = product.get("id").and_then(Value::as_i64).expect("product id");
    let resp = http
        .patch(format!(
            "{}/vendor/shops/{shop_id}/products/{product_id}",
            base_url()
        ))
        .json(&json!({ "status": "active" }))
        .send()
        .await
        .expect("Failed to activate product");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and vendor credentials"]
async fn duplicate_slug_conflicts() {
    let Some(http) = vendor_client().await else {
        return;
    };

    let slug = format!("it-dup-{}", Uuid::new_v4().simple());
    let create = |slug: String| {
        let http = http.clone();
        async move {
            http.post(format!("{}/vendor/shops", base_url()))
                .json(&json!({ "name": "Dup", "slug": slug }))
                .send()
                .await
                .expect("Failed to create shop")
        }
    };

    assert_eq!(create(slug.clone()).await.status(), StatusCode::OK);
    assert_eq!(create(slug).await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and vendor credentials"]
async fn shipping_methods_and_restrictions_round_trip() {
    let Some(http) = vendor_client().await else {
        return;
    };

    let shop_id = create_shop(&http).await;

    let resp = http
        .post(format!(
            "{}/vendor/shops/{shop_id}/shipping-methods",
            base_url()
        ))
        .json(&json!({ "name": "Courier", "carrier": "DHL", "rate": "9.00" }))
        .send()
        .await
        .expect("Failed to create method");
    assert_eq!(resp.status(), StatusCode::OK);
    let method: Value = resp.json().await.expect("Failed to parse method");
    let method_id = method.get("id").and_then(Value::as_i64).expect("method id");

    let resp = http
        .post(format!("{}/vendor/shops/{shop_id}/products", base_url()))
        .json(&json!({ "title": "Restricted Widget", "price": "5.00" }))
        .send()
        .await
        .expect("Failed to create product");
    let product: Value = resp.json().await.expect("Failed to parse product");
    let product_id = product.get("id").and_then(Value::as_i64).expect("product id");

    let resp = http
        .put(format!(
            "{}/vendor/shops/{shop_id}/products/{product_id}/shipping-restrictions",
            base_url()
        ))
        .json(&json!({ "shipping_method_ids": [method_id] }))
        .send()
        .await
        .expect("Failed to set restrictions");
    assert_eq!(resp.status(), StatusCode::OK);

    // Methods from another shop must be rejected.
    let resp = http
        .put(format!(
            "{}/vendor/shops/{shop_id}/products/{product_id}/shipping-restrictions",
            base_url()
        ))
        .json(&json!({ "shipping_method_ids": [999_999_999] }))
        .send()
        .await
        .expect("Failed to send restrictions");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and vendor credentials"]
async fn vendors_cannot_touch_other_shops() {
    let Some(http) = vendor_client().await else {
        return;
    };

    // A shop id that is not ours (or does not exist) reads as 404 either
    // way; existence is not revealed.
    let resp = http
        .get(format!("{}/vendor/shops/999999999/products", base_url()))
        .send()
        .await
        .expect("Failed to request foreign shop");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running marketplace server and vendor credentials"]
async fn coupon_lifecycle() {
    let Some(http) = vendor_client().await else {
        return;
    };

    let shop_id = create_shop(&http).await;
    let code = format!("IT{}", Uuid::new_v4().simple());

    let resp = http
        .post(format!("{}/vendor/shops/{shop_id}/coupons", base_url()))
        .json(&json!({
            "code": code,
            "kind": "percentage",
            "value": "15",
            "usage_limit": 5,
        }))
        .send()
        .await
        .expect("Failed to create coupon");
    assert_eq!(resp.status(), StatusCode::OK);
    let coupon: Value = resp.json().await.expect("Failed to parse coupon");
    let coupon_id = coupon.get("id").and_then(Value::as_i64).expect("coupon id");

    let resp = http
        .patch(format!(
            "{}/vendor/shops/{shop_id}/coupons/{coupon_id}",
            base_url()
        ))
        .json(&json!({ "active": false }))
        .send()
        .await
        .expect("Failed to deactivate coupon");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = http
        .delete(format!(
            "{}/vendor/shops/{shop_id}/coupons/{coupon_id}",
            base_url()
        ))
        .send()
        .await
        .expect("Failed to delete coupon");
    assert_eq!(resp.status(), StatusCode::OK);
}
