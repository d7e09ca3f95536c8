//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database ping)
//!
//! # Auth (rate limited)
//! POST /auth/register                   - Create a customer account
//! POST /auth/login                      - Start a session
//! POST /auth/logout                     - End the session
//! GET  /auth/me                         - Current account
//!
//! # Storefront (optional auth)
//! GET  /shops/{slug}/products           - Active products of an active shop
//! GET  /products/{id}                   - Product detail
//! GET  /products/{id}/reviews           - Published reviews
//! POST /cart/shipping-options           - Methods valid for a whole cart
//! POST /orders                          - Checkout
//! GET  /orders                          - Own order history (requires auth)
//! GET  /orders/{id}                     - Order detail (owner/guest/admin)
//! GET  /orders/{id}/receipt             - Hosted receipt or invoice URL
//! POST /orders/{id}/reviews             - Review a purchased product
//!
//! # Vendor dashboard (vendor role + shop ownership)
//! GET  /vendor/shops                    - Own shops
//! POST /vendor/shops                    - Create a shop
//! PATCH /vendor/shops/{id}              - Rename a shop
//! GET|POST /vendor/shops/{id}/products  - List / create products
//! PATCH|DELETE /vendor/shops/{id}/products/{pid}
//! PUT  /vendor/shops/{id}/products/{pid}/shipping-restrictions
//! GET|POST /vendor/shops/{id}/shipping-methods
//! PATCH|DELETE /vendor/shops/{id}/shipping-methods/{mid}
//! GET  /vendor/shops/{id}/orders        - Shop order list
//! POST /vendor/shops/{id}/orders/{oid}/fulfill
//! GET|POST /vendor/shops/{id}/coupons
//! PATCH|DELETE /vendor/shops/{id}/coupons/{cid}
//!
//! # Admin console (admin role)
//! GET  /admin/tenants                   - Shops joined with vendor contact
//! POST /admin/tenants/{id}/suspend      - Suspend (emails the vendor)
//! POST /admin/tenants/{id}/activate
//! GET  /admin/users                     - User list
//! PATCH /admin/users/{id}/role          - Change a user's role
//! GET|POST /admin/tax-rates
//! PATCH|DELETE /admin/tax-rates/{id}
//! GET|POST /admin/coupons               - Platform-wide coupons
//! PATCH|DELETE /admin/coupons/{id}
//! GET  /admin/transactions              - Payments joined with orders
//! POST /admin/transactions/{id}/reconcile
//! GET  /admin/reviews                   - Moderation queue
//! POST /admin/reviews/{id}/publish
//! POST /admin/reviews/{id}/reject
//!
//! # Webhooks
//! POST /webhooks/stripe                 - Signed gateway event deliveries
//! ```

pub mod admin;
pub mod auth;
pub mod storefront;
pub mod vendor;
pub mod webhooks;

use axum::Router;

use crate::middleware::rate_limit;
use crate::state::AppState;

/// Assemble the full application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(storefront::router())
        .nest("/auth", auth::router().layer(rate_limit::auth_rate_limiter()))
        .nest("/vendor", vendor::router())
        .nest("/admin", admin::router())
        .nest("/webhooks", webhooks::router())
}
