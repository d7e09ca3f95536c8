//! Database operations for the marketplace `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts for all three surfaces (customer, vendor, admin)
//! - `shops` - Tenants owned by vendor accounts
//! - `products` - Shop-scoped listings
//! - `shipping_methods` / `product_shipping_restrictions` - Shipping setup
//! - `tax_rates` - Admin-managed tax table
//! - `coupons` - Shop-scoped and platform-wide discounts
//! - `orders` / `order_items` - Purchases and line item snapshots
//! - `payments` - Local mirror of gateway payment intents
//! - `reviews` - Purchase-derived product reviews
//! - `session` - Tower-sessions storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p portobello-cli -- migrate
//! ```
//!
//! Queries use the sqlx runtime API (`query_as` + `bind`) rather than the
//! compile-time macros, so the workspace builds without a live database.

pub mod coupons;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod shipping;
pub mod shops;
pub mod tax_rates;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use coupons::CouponRepository;
pub use orders::OrderRepository;
pub use payments::PaymentRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use shipping::ShippingRepository;
pub use shops::ShopRepository;
pub use tax_rates::TaxRateRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, converting unique-constraint violations into
    /// [`RepositoryError::Conflict`] with a caller-supplied description.
    #[must_use]
    pub fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(format!("{what} already exists"))
            }
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
