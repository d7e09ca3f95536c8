//! Public storefront handlers: browsing, carts, checkout, orders, reviews.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use portobello_core::{OrderId, ProductId, ProductStatus, ShippingMethodId, ShopStatus};

use crate::db::{
    OrderRepository, PaymentRepository, ProductRepository, ReviewRepository, ShopRepository,
    reviews::CreateReview,
};
use crate::error::AppError;
use crate::middleware::{OptionalUser, RequireUser};
use crate::models::{Order, OrderItem, Page, PageQuery, Product, Review, ShippingMethod};
use crate::services::checkout::{self, CartLine, CheckoutInput, CheckoutOutcome};
use crate::services::receipts::{self, GuestReceiptAccess, ReceiptResolution};
use crate::services::shipping;
use crate::state::AppState;

/// Build the storefront router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shops/{slug}/products", get(shop_products))
        .route("/products/{id}", get(product_detail))
        .route("/products/{id}/reviews", get(product_reviews))
        .route("/cart/shipping-options", post(shipping_options))
        .route("/orders", post(place_order).get(my_orders))
        .route("/orders/{id}", get(order_detail))
        .route("/orders/{id}/receipt", get(order_receipt))
        .route("/orders/{id}/reviews", post(create_review))
}

/// Active products of an active shop, paginated.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the slug does not resolve to an active shop.
async fn shop_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Product>>, AppError> {
    let shop = ShopRepository::new(state.pool())
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop '{slug}'")))?;

    let page = ProductRepository::new(state.pool())
        .list_active(shop.id, &query)
        .await?;

    Ok(Json(page))
}

/// Product detail. Draft and archived products, and products of suspended
/// shops, are invisible here.
///
/// # Errors
///
/// Returns `AppError::NotFound` when the product is not publicly visible.
async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    let not_found = || AppError::NotFound(format!("product {id}"));

    let product = ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .filter(|p| p.status == ProductStatus::Active)
        .ok_or_else(not_found)?;

    ShopRepository::new(state.pool())
        .get_by_id(product.shop_id)
        .await?
        .filter(|s| s.status == ShopStatus::Active)
        .ok_or_else(not_found)?;

    Ok(Json(product))
}

/// Published reviews for a product, paginated.
///
/// # Errors
///
/// Returns database errors from the listing.
async fn product_reviews(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Review>>, AppError> {
    let page = ReviewRepository::new(state.pool())
        .list_published(id, &query)
        .await?;

    Ok(Json(page))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingOptionsRequest {
    #[validate(length(min = 1, max = 100))]
    pub product_ids: Vec<ProductId>,
}

/// Shipping methods valid for a whole cart.
///
/// # Errors
///
/// Returns `AppError::NotFound` if any product does not exist.
async fn shipping_options(
    State(state): State<AppState>,
    Json(payload): Json<ShippingOptionsRequest>,
) -> Result<Json<Vec<ShippingMethod>>, AppError> {
    payload.validate()?;

    let methods = shipping::shipping_options(&state, &payload.product_ids).await?;
    Ok(Json(methods))
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CheckoutItemRequest {
    pub product_id: ProductId,
    #[validate(range(min = 1, max = 999))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 100), nested)]
    pub items: Vec<CheckoutItemRequest>,
    pub shipping_method_id: ShippingMethodId,
    #[validate(length(min = 1, max = 64))]
    pub coupon_code: Option<String>,
    /// ISO 3166-1 alpha-2 destination country.
    #[validate(length(equal = 2))]
    pub shipping_country: String,
    #[validate(length(min = 1, max = 10))]
    pub shipping_region: Option<String>,
    /// Required when no session user is present.
    #[validate(email)]
    pub guest_email: Option<String>,
}

/// Checkout: place an order for a single-shop cart.
///
/// # Errors
///
/// See [`checkout::place_order`].
async fn place_order(
    State(state): State<AppState>,
    OptionalUser(caller): OptionalUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutOutcome>, AppError> {
    payload.validate()?;

    let input = CheckoutInput {
        lines: payload
            .items
            .iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
        shipping_method_id: payload.shipping_method_id,
        coupon_code: payload.coupon_code,
        shipping_country: payload.shipping_country.to_ascii_uppercase(),
        shipping_region: payload.shipping_region,
        guest_email: payload.guest_email,
    };

    let outcome = checkout::place_order(&state, caller.as_ref(), input).await?;
    Ok(Json(outcome))
}

/// The logged-in customer's order history, newest first.
///
/// # Errors
///
/// Returns database errors from the listing.
async fn my_orders(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Order>>, AppError> {
    let page = OrderRepository::new(state.pool())
        .list_for_user(user.id, &query)
        .await?;

    Ok(Json(page))
}

/// Guest credentials accepted on order and receipt lookups.
#[derive(Debug, Deserialize)]
pub struct GuestAccessQuery {
    pub email: Option<String>,
    pub intent_id: Option<String>,
}

impl GuestAccessQuery {
    fn as_access(&self) -> Option<GuestReceiptAccess<'_>> {
        match (self.email.as_deref(), self.intent_id.as_deref()) {
            (Some(email), Some(intent_id)) => Some(GuestReceiptAccess { email, intent_id }),
            _ => None,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order detail for the owner, a matching guest, or an admin.
///
/// # Errors
///
/// Returns `AppError::NotFound` for missing orders and
/// `AppError::Forbidden` for callers that fail the ownership check.
async fn order_detail(
    State(state): State<AppState>,
    OptionalUser(caller): OptionalUser,
    Path(id): Path<OrderId>,
    Query(guest): Query<GuestAccessQuery>,
) -> Result<Json<OrderDetail>, AppError> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let owner_or_admin = caller
        .as_ref()
        .is_some_and(|user| user.is_admin() || order.user_id == Some(user.id));

    if !owner_or_admin {
        // Guests prove access the same way receipts do: contact email plus
        // the payment-intent ID from the checkout response.
        let payment = PaymentRepository::new(state.pool())
            .get_by_order(order.id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("you do not have access to this order".to_string())
            })?;
        let authorized = guest.as_access().is_some_and(|access| {
            receipts::authorize_receipt(&order, &payment, caller.as_ref(), Some(&access))
        });
        if !authorized {
            return Err(AppError::Forbidden(
                "you do not have access to this order".to_string(),
            ));
        }
    }

    let items = repo.items(order.id).await?;
    Ok(Json(OrderDetail { order, items }))
}

/// Hosted receipt or invoice URL for an order.
///
/// # Errors
///
/// See [`receipts::receipt_for_order`].
async fn order_receipt(
    State(state): State<AppState>,
    OptionalUser(caller): OptionalUser,
    Path(id): Path<OrderId>,
    Query(guest): Query<GuestAccessQuery>,
) -> Result<Json<ReceiptResolution>, AppError> {
    let resolution =
        receipts::receipt_for_order(&state, id, caller.as_ref(), guest.as_access()).await?;

    Ok(Json(resolution))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    pub product_id: ProductId,
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
    /// Lets a guest purchaser review by proving the order's contact email.
    #[validate(email)]
    pub guest_email: Option<String>,
}

/// Review a product purchased in an order. One review per (product, order).
///
/// # Errors
///
/// Returns `AppError::Forbidden` for non-purchasers, `AppError::BadRequest`
/// for unpaid orders or products outside the order, and
/// `AppError::Conflict` for duplicate reviews.
async fn create_review(
    State(state): State<AppState>,
    OptionalUser(caller): OptionalUser,
    Path(id): Path<OrderId>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<Review>, AppError> {
    payload.validate()?;

    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let is_owner = caller
        .as_ref()
        .is_some_and(|user| order.user_id == Some(user.id));
    let is_matching_guest = order.user_id.is_none()
        && match (order.guest_email.as_deref(), payload.guest_email.as_deref()) {
            (Some(on_order), Some(claimed)) => on_order.eq_ignore_ascii_case(claimed),
            _ => false,
        };
    if !is_owner && !is_matching_guest {
        return Err(AppError::Forbidden(
            "only the purchaser can review this order".to_string(),
        ));
    }

    if !order.is_purchased() {
        return Err(AppError::BadRequest(
            "order has not been paid yet".to_string(),
        ));
    }

    if !repo.contains_product(order.id, payload.product_id).await? {
        return Err(AppError::BadRequest(
            "product is not part of this order".to_string(),
        ));
    }

    let review = ReviewRepository::new(state.pool())
        .create(CreateReview {
            product_id: payload.product_id,
            order_id: order.id,
            user_id: order.user_id,
            rating: payload.rating,
            title: payload.title.as_deref(),
            body: &payload.body,
        })
        .await?;

    Ok(Json(review))
}
