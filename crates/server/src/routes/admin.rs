//! Admin console handlers: tenants, users, tax rates, platform coupons,
//! transactions, and review moderation.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use portobello_core::{
    CouponId, CouponKind, PaymentId, PaymentStatus, ReviewId, ReviewStatus, ShopId, ShopStatus,
    TaxRateId, UserId, UserRole,
};

use crate::db::{
    CouponRepository, PaymentRepository, ReviewRepository, ShopRepository, TaxRateRepository,
    UserRepository,
    coupons::{CouponUpdate, CreateCoupon},
    payments::TransactionListing,
    shops::TenantListing,
    tax_rates::TaxRateUpdate,
};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Coupon, Page, PageQuery, Review, Shop, TaxRate, User};
use crate::services::reconcile::{self, ReconcileReport};
use crate::state::AppState;

use super::vendor::validate_coupon_value;

/// Build the admin router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants))
        .route("/tenants/{id}/suspend", post(suspend_tenant))
        .route("/tenants/{id}/activate", post(activate_tenant))
        .route("/users", get(list_users))
        .route("/users/{id}/role", patch(set_user_role))
        .route("/tax-rates", get(list_tax_rates).post(create_tax_rate))
        .route(
            "/tax-rates/{id}",
            patch(update_tax_rate).delete(delete_tax_rate),
        )
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route(
            "/coupons/{id}",
            patch(update_coupon).delete(delete_coupon),
        )
        .route("/transactions", get(list_transactions))
        .route("/transactions/{id}/reconcile", post(reconcile_transaction))
        .route("/reviews", get(list_reviews))
        .route("/reviews/{id}/publish", post(publish_review))
        .route("/reviews/{id}/reject", post(reject_review))
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TenantFilter {
    pub status: Option<ShopStatus>,
}

async fn list_tenants(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PageQuery>,
    Query(filter): Query<TenantFilter>,
) -> Result<Json<Page<TenantListing>>, AppError> {
    let page = ShopRepository::new(state.pool())
        .list_tenants(&query, filter.status)
        .await?;
    Ok(Json(page))
}

/// Suspend a tenant and notify its vendor by email.
///
/// The notification is best-effort: a send failure is logged and the
/// suspension still succeeds.
async fn suspend_tenant(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ShopId>,
) -> Result<Json<Shop>, AppError> {
    let repo = ShopRepository::new(state.pool());
    let shop = repo.set_status(id, ShopStatus::Suspended).await?;

    tracing::info!(shop = %shop.id, admin = %admin.id, "tenant suspended");

    if let Some(email) = state.email() {
        match repo.vendor_contact(shop.id).await {
            Ok((vendor_email, vendor_name)) => {
                if let Err(e) = email
                    .send_shop_suspended(&vendor_email, &vendor_name, &shop.name)
                    .await
                {
                    tracing::warn!(shop = %shop.id, error = %e, "suspension notice failed to send");
                }
            }
            Err(e) => {
                tracing::warn!(shop = %shop.id, error = %e, "could not look up vendor contact");
            }
        }
    }

    Ok(Json(shop))
}

async fn activate_tenant(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ShopId>,
) -> Result<Json<Shop>, AppError> {
    let shop = ShopRepository::new(state.pool())
        .set_status(id, ShopStatus::Active)
        .await?;

    tracing::info!(shop = %shop.id, admin = %admin.id, "tenant activated");
    Ok(Json(shop))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
}

async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PageQuery>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Page<User>>, AppError> {
    let page = UserRepository::new(state.pool())
        .list(&query, filter.role)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

/// Change a user's platform role. This is the only way an account becomes
/// a vendor or an admin.
async fn set_user_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<User>, AppError> {
    if admin.id == id && payload.role != UserRole::Admin {
        return Err(AppError::BadRequest(
            "admins cannot demote themselves".to_string(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .set_role(id, payload.role)
        .await?;

    tracing::info!(user = %user.id, role = payload.role.as_str(), admin = %admin.id, "role changed");
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// Tax rates
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaxRateRequest {
    /// ISO 3166-1 alpha-2 country code.
    #[validate(length(equal = 2))]
    pub country: String,
    /// Region/state code; omit for a country-wide rate.
    #[validate(length(min = 1, max = 10))]
    pub region: Option<String>,
    /// Percentage, e.g. 8.25 for 8.25%.
    pub rate: Decimal,
    pub inclusive: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaxRateRequest {
    pub rate: Option<Decimal>,
    pub inclusive: Option<bool>,
    pub active: Option<bool>,
}

fn validate_tax_rate(rate: Decimal) -> Result<(), AppError> {
    if rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "tax rate must be between 0 and 100 percent".to_string(),
        ))
    }
}

async fn list_tax_rates(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<TaxRate>>, AppError> {
    let page = TaxRateRepository::new(state.pool()).list(&query).await?;
    Ok(Json(page))
}

async fn create_tax_rate(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<CreateTaxRateRequest>,
) -> Result<Json<TaxRate>, AppError> {
    payload.validate()?;
    validate_tax_rate(payload.rate)?;

    let rate = TaxRateRepository::new(state.pool())
        .create(
            &payload.country.to_ascii_uppercase(),
            payload.region.as_deref(),
            payload.rate,
            payload.inclusive.unwrap_or(false),
        )
        .await?;
    Ok(Json(rate))
}

async fn update_tax_rate(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<TaxRateId>,
    Json(payload): Json<UpdateTaxRateRequest>,
) -> Result<Json<TaxRate>, AppError> {
    if let Some(rate) = payload.rate {
        validate_tax_rate(rate)?;
    }

    let rate = TaxRateRepository::new(state.pool())
        .update(
            id,
            TaxRateUpdate {
                rate: payload.rate,
                inclusive: payload.inclusive,
                active: payload.active,
            },
        )
        .await?;
    Ok(Json(rate))
}

async fn delete_tax_rate(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<TaxRateId>,
) -> Result<Json<serde_json::Value>, AppError> {
    TaxRateRepository::new(state.pool()).delete(id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Platform-wide coupons
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlatformCouponRequest {
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
pub struct UpdatePlatformCouponRequest {
    pub ends_at: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    pub active: Option<bool>,
}

async fn list_coupons(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Coupon>>, AppError> {
    let coupons = CouponRepository::new(state.pool()).list_platform().await?;
    Ok(Json(coupons))
}

async fn create_coupon(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<CreatePlatformCouponRequest>,
) -> Result<Json<Coupon>, AppError> {
    payload.validate()?;
    validate_coupon_value(payload.kind, payload.value)?;

    let coupon = CouponRepository::new(state.pool())
        .create(CreateCoupon {
            shop_id: None,
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
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CouponId>,
    Json(payload): Json<UpdatePlatformCouponRequest>,
) -> Result<Json<Coupon>, AppError> {
    payload.validate()?;

    let coupon = CouponRepository::new(state.pool())
        .update(
            id,
            None,
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
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CouponId>,
) -> Result<Json<serde_json::Value>, AppError> {
    CouponRepository::new(state.pool()).delete(id, None).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TransactionFilter {
    pub status: Option<PaymentStatus>,
}

async fn list_transactions(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PageQuery>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Page<TransactionListing>>, AppError> {
    let page = PaymentRepository::new(state.pool())
        .list_transactions(&query, filter.status)
        .await?;
    Ok(Json(page))
}

/// Cross-check one payment against the gateway and adopt its status when
/// the gateway disagrees.
async fn reconcile_transaction(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<PaymentId>,
) -> Result<Json<ReconcileReport>, AppError> {
    let report = reconcile::reconcile_payment(&state, id).await?;

    tracing::info!(
        payment = %id,
        admin = %admin.id,
        status_matches = report.status_matches,
        amount_matches = report.amount_matches,
        "transaction reconciled"
    );
    Ok(Json(report))
}

// ---------------------------------------------------------------------------
// Review moderation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
}

/// The moderation queue, oldest first. Defaults to pending reviews.
async fn list_reviews(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PageQuery>,
    Query(filter): Query<ReviewFilter>,
) -> Result<Json<Page<Review>>, AppError> {
    let status = filter.status.unwrap_or(ReviewStatus::Pending);
    let page = ReviewRepository::new(state.pool())
        .list_by_status(status, &query)
        .await?;
    Ok(Json(page))
}

async fn publish_review(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>, AppError> {
    let review = ReviewRepository::new(state.pool())
        .set_status(id, ReviewStatus::Published)
        .await?;
    Ok(Json(review))
}

async fn reject_review(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>, AppError> {
    let review = ReviewRepository::new(state.pool())
        .set_status(id, ReviewStatus::Rejected)
        .await?;
    Ok(Json(review))
}
