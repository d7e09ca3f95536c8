//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use portobello_core::ShopId;

use crate::config::ServerConfig;
use crate::models::ShippingMethod;
use crate::services::email::{EmailError, EmailService};
use crate::stripe::StripeClient;

/// How long a shop's active shipping methods stay cached without being
/// explicitly invalidated by a vendor mutation.
const METHOD_CACHE_TTL: Duration = Duration::from_secs(300);
/// Upper bound on cached shops.
const METHOD_CACHE_CAPACITY: u64 = 10_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    stripe: Option<StripeClient>,
    email: Option<EmailService>,
    /// Per-shop active shipping methods, invalidated on method mutations.
    method_cache: Cache<ShopId, Arc<Vec<ShippingMethod>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the Stripe client and email service from whatever sections of
    /// the configuration are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be constructed.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, EmailError> {
        let stripe = config.stripe().map(StripeClient::new);
        let email = config
            .email()
            .map(EmailService::new)
            .transpose()
            .map_err(EmailError::Smtp)?;

        let method_cache = Cache::builder()
            .max_capacity(METHOD_CACHE_CAPACITY)
            .time_to_live(METHOD_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                email,
                method_cache,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the Stripe client, if payments are configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Per-shop cache of active shipping methods.
    #[must_use]
    pub fn method_cache(&self) -> &Cache<ShopId, Arc<Vec<ShippingMethod>>> {
        &self.inner.method_cache
    }

    /// Drop a shop's cached shipping methods after a vendor mutation.
    pub async fn invalidate_methods(&self, shop_id: ShopId) {
        self.inner.method_cache.invalidate(&shop_id).await;
    }
}
