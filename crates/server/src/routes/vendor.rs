//! Vendor dashboard handlers.
//!
//! Every shop-scoped route resolves the shop through [`owned_shop`] first,
//! so a vendor can never reach another vendor's rows no matter what IDs
//! they put in the path.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use portobello_core::{
    CouponId, CouponKind, CurrencyCode, OrderId, OrderStatus, ProductId, ProductStatus,
    ShippingMethodId, ShopId,
};

use crate::db::{
    CouponRepository, OrderRepository, ProductRepository, ShippingRepository, ShopRepository,
    coupons::{CreateCoupon, CouponUpdate},
    products::ProductUpdate,
    shipping::ShippingMethodUpdate,
};
use crate::error::AppError;
use crate::middleware::RequireVendor;
use crate::models::{
    Coupon, CurrentUser, Order, Page, PageQuery, Product, ShippingMethod, Shop,
};
use crate::state::AppState;

/// Build the vendor router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shops", get(list_shops).post(create_shop))
        .route("/shops/{id}", patch(update_shop))
        .route(
            "/shops/{id}/products",
            get(list_products).post(create_product),
        )
        .route(
            "/shops/{id}/products/{pid}",
            patch(update_product).delete(delete_product),
        )
        .route(
            "/shops/{id}/products/{pid}/shipping-restrictions",
            put(replace_restrictions),
        )
        .route(
            "/shops/{id}/shipping-methods",
            get(list_methods).post(create_method),
        )
        .route(
            "/shops/{id}/shipping-methods/{mid}",
            patch(update_method).delete(delete_method),
        )
        .route("/shops/{id}/orders", get(list_orders))
        .route("/shops/{id}/orders/{oid}/fulfill", post(fulfill_order))
        .route("/shops/{id}/coupons", get(list_coupons).post(create_coupon))
        .route(
            "/shops/{id}/coupons/{cid}",
            patch(update_coupon).delete(delete_coupon),
        )
}

/// Resolve a shop the calling vendor owns.
///
/// # Errors
///
/// Returns `AppError::NotFound` when the shop does not exist or belongs to
/// another vendor; existence of other vendors' shops is not revealed.
async fn owned_shop(
    state: &AppState,
    vendor: &CurrentUser,
    shop_id: ShopId,
) -> Result<Shop, AppError> {
    ShopRepository::new(state.pool())
        .get_owned(shop_id, vendor.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop {shop_id}")))
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    let ok = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if ok {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "slug must be lowercase letters, digits, and hyphens".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Shops
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateShopRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 2, max = 64))]
    pub slug: String,
}

async fn list_shops(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
) -> Result<Json<Vec<Shop>>, AppError> {
    let shops = ShopRepository::new(state.pool())
        .list_by_vendor(vendor.id)
        .await?;
    Ok(Json(shops))
}

async fn create_shop(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Json(payload): Json<CreateShopRequest>,
) -> Result<Json<Shop>, AppError> {
    payload.validate()?;
    validate_slug(&payload.slug)?;

    let shop = ShopRepository::new(state.pool())
        .create(vendor.id, &payload.name, &payload.slug)
        .await?;
    Ok(Json(shop))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateShopRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

async fn update_shop(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
    Json(payload): Json<UpdateShopRequest>,
) -> Result<Json<Shop>, AppError> {
    payload.validate()?;
    let shop = owned_shop(&state, &vendor, id).await?;

    let updated = ShopRepository::new(state.pool())
        .update_name(shop.id, &payload.name)
        .await?;
    Ok(Json(updated))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 10_000))]
    pub description: Option<String>,
    pub price: Decimal,
    /// ISO 4217 code; defaults to USD.
    pub currency: Option<String>,
    #[validate(range(min = 0))]
    pub inventory: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 10_000))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub status: Option<ProductStatus>,
    #[validate(range(min = 0))]
    pub inventory: Option<i32>,
}

async fn list_products(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Product>>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    let page = ProductRepository::new(state.pool())
        .list_for_shop(shop.id, &query)
        .await?;
    Ok(Json(page))
}

async fn create_product(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Json<Product>, AppError> {
    payload.validate()?;
    let shop = owned_shop(&state, &vendor, id).await?;

    if payload.price < Decimal::ZERO {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }
    let currency = match payload.currency.as_deref() {
        Some(code) => CurrencyCode::parse(code)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported currency {code}")))?,
        None => CurrencyCode::default(),
    };

    let product = ProductRepository::new(state.pool())
        .create(
            shop.id,
            &payload.title,
            payload.description.as_deref(),
            payload.price,
            currency.as_str(),
            payload.inventory.unwrap_or(0),
        )
        .await?;
    Ok(Json(product))
}

async fn update_product(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, pid)): Path<(ShopId, ProductId)>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    payload.validate()?;
    let shop = owned_shop(&state, &vendor, id).await?;

    if payload.price.is_some_and(|price| price < Decimal::ZERO) {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let product = ProductRepository::new(state.pool())
        .update(
            shop.id,
            pid,
            ProductUpdate {
                title: payload.title.as_deref(),
                description: payload.description.as_deref(),
                price: payload.price,
                status: payload.status,
                inventory: payload.inventory,
            },
        )
        .await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, pid)): Path<(ShopId, ProductId)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    ProductRepository::new(state.pool())
        .delete(shop.id, pid)
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RestrictionsRequest {
    /// Methods the product may ship with; an empty list restores the
    /// "all methods permitted" default.
    #[validate(length(max = 100))]
    pub shipping_method_ids: Vec<ShippingMethodId>,
}

async fn replace_restrictions(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, pid)): Path<(ShopId, ProductId)>,
    Json(payload): Json<RestrictionsRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload.validate()?;
    let shop = owned_shop(&state, &vendor, id).await?;

    let shipping = ShippingRepository::new(state.pool());

    // Both the product and every listed method must live in this shop.
    ProductRepository::new(state.pool())
        .get_by_id(pid)
        .await?
        .filter(|p| p.shop_id == shop.id)
        .ok_or_else(|| AppError::NotFound(format!("product {pid}")))?;
    for method_id in &payload.shipping_method_ids {
        shipping
            .get_method(shop.id, *method_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("shipping method {method_id}")))?;
    }

    shipping
        .replace_restrictions(pid, &payload.shipping_method_ids)
        .await?;
    Ok(Json(serde_json::json!({ "replaced": true })))
}

// ---------------------------------------------------------------------------
// Shipping methods
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMethodRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub carrier: Option<String>,
    pub rate: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMethodRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub carrier: Option<String>,
    pub rate: Option<Decimal>,
    pub active: Option<bool>,
}

async fn list_methods(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
) -> Result<Json<Vec<ShippingMethod>>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    let methods = ShippingRepository::new(state.pool())
        .list_for_shop(shop.id)
        .await?;
    Ok(Json(methods))
}

async fn create_method(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
    Json(payload): Json<CreateMethodRequest>,
) -> Result<Json<ShippingMethod>, AppError> {
    payload.validate()?;
    let shop = owned_shop(&state, &vendor, id).await?;

    if payload.rate < Decimal::ZERO {
        return Err(AppError::BadRequest("rate must not be negative".to_string()));
    }

    let method = ShippingRepository::new(state.pool())
        .create_method(shop.id, &payload.name, payload.carrier.as_deref(), payload.rate)
        .await?;

    state.invalidate_methods(shop.id).await;
    Ok(Json(method))
}

async fn update_method(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, mid)): Path<(ShopId, ShippingMethodId)>,
    Json(payload): Json<UpdateMethodRequest>,
) -> Result<Json<ShippingMethod>, AppError> {
    payload.validate()?;
    let shop = owned_shop(&state, &vendor, id).await?;

    if payload.rate.is_some_and(|rate| rate < Decimal::ZERO) {
        return Err(AppError::BadRequest("rate must not be negative".to_string()));
    }

    let method = ShippingRepository::new(state.pool())
        .update_method(
            shop.id,
            mid,
            ShippingMethodUpdate {
                name: payload.name.as_deref(),
                carrier: payload.carrier.as_deref(),
                rate: payload.rate,
                active: payload.active,
            },
        )
        .await?;

    state.invalidate_methods(shop.id).await;
    Ok(Json(method))
}

async fn delete_method(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, mid)): Path<(ShopId, ShippingMethodId)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    ShippingRepository::new(state.pool())
        .delete_method(shop.id, mid)
        .await?;

    state.invalidate_methods(shop.id).await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

async fn list_orders(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
    Query(query): Query<PageQuery>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Page<Order>>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    let page = OrderRepository::new(state.pool())
        .list_for_shop(shop.id, &query, filter.status)
        .await?;
    Ok(Json(page))
}

/// Move a paid order to fulfilled.
///
/// # Errors
///
/// Returns `AppError::NotFound` when the order is missing, belongs to
/// another shop, or is not currently paid.
async fn fulfill_order(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, oid)): Path<(ShopId, OrderId)>,
) -> Result<Json<Order>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    let order = OrderRepository::new(state.pool())
        .fulfill(shop.id, oid)
        .await?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Coupons
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCouponRequest {
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    pub active: Option<bool>,
}

pub(super) fn validate_coupon_value(kind: CouponKind, value: Decimal) -> Result<(), AppError> {
    let ok = match kind {
        CouponKind::Percentage => value > Decimal::ZERO && value <= Decimal::ONE_HUNDRED,
        CouponKind::Fixed => value > Decimal::ZERO,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "coupon value must be positive (and at most 100 for percentages)".to_string(),
        ))
    }
}

async fn list_coupons(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
) -> Result<Json<Vec<Coupon>>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    let coupons = CouponRepository::new(state.pool())
        .list_for_shop(shop.id)
        .await?;
    Ok(Json(coupons))
}

async fn create_coupon(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path(id): Path<ShopId>,
    Json(payload): Json<CreateCouponRequest>,
) -> Result<Json<Coupon>, AppError> {
    payload.validate()?;
    validate_coupon_value(payload.kind, payload.value)?;
    let shop = owned_shop(&state, &vendor, id).await?;

    let coupon = CouponRepository::new(state.pool())
        .create(CreateCoupon {
            shop_id: Some(shop.id),
            code: &payload.code,
            kind: payload.kind,
            value: payload.value,
            starts_at: payload.starts_at.unwrap_or_else(Utc::now),
            ends_at: payload.ends_at,
            usage_limit: payload.usage_limit,
        })
        .await?;
    Ok(Json(coupon))
}

async fn update_coupon(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, cid)): Path<(ShopId, CouponId)>,
    Json(payload): Json<UpdateCouponRequest>,
) -> Result<Json<Coupon>, AppError> {
    payload.validate()?;
    let shop = owned_shop(&state, &vendor, id).await?;

    let coupon = CouponRepository::new(state.pool())
        .update(
            cid,
            Some(shop.id),
            CouponUpdate {
                ends_at: payload.ends_at,
                usage_limit: payload.usage_limit,
                active: payload.active,
            },
        )
        .await?;
    Ok(Json(coupon))
}

async fn delete_coupon(
    State(state): State<AppState>,
    RequireVendor(vendor): RequireVendor,
    Path((id, cid)): Path<(ShopId, CouponId)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let shop = owned_shop(&state, &vendor, id).await?;

    CouponRepository::new(state.pool())
        .delete(cid, Some(shop.id))
        .await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_lowercase_hyphenated() {
        assert!(validate_slug("acme-supply-2").is_ok());
        assert!(validate_slug("Acme").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("trailing-").is_err());
        assert!(validate_slug("spa ce").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn coupon_values_are_bounded_by_kind() {
        let hundred = Decimal::ONE_HUNDRED;
        assert!(validate_coupon_value(CouponKind::Percentage, Decimal::TEN).is_ok());
        assert!(validate_coupon_value(CouponKind::Percentage, hundred).is_ok());
        assert!(validate_coupon_value(CouponKind::Percentage, hundred + Decimal::ONE).is_err());
        assert!(validate_coupon_value(CouponKind::Fixed, Decimal::new(500, 2)).is_ok());
        assert!(validate_coupon_value(CouponKind::Fixed, Decimal::ZERO).is_err());
    }
}
