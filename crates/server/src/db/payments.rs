//! Payment repository.
//!
//! Payments mirror gateway payment intents. The admin "transactions" screen
//! reads the join of payments and orders from here.

use rust_decimal::Decimal;
use sqlx::PgPool;

use portobello_core::{OrderId, PaymentId, PaymentStatus};

use super::RepositoryError;
use crate::models::{Page, PageQuery, Payment};

const SORT_WHITELIST: &[(&str, &str)] = &[
    ("created_at", "p.created_at"),
    ("amount", "p.amount"),
    ("status", "p.status"),
];

const PAYMENT_COLUMNS: &str = "id, order_id, provider, intent_id, status, amount, currency, \
                               receipt_email, created_at, updated_at";

/// A payment joined with its order, for the admin transactions list.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct TransactionListing {
    #[sqlx(flatten)]
    pub payment: Payment,
    /// Human-facing order number.
    pub order_number: String,
    /// Shop the order was placed against.
    pub shop_name: String,
}

/// Repository for payment database operations.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a payment for a freshly created gateway intent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the intent is already recorded.
    pub async fn create(
        &self,
        order_id: OrderId,
        intent_id: &str,
        amount: Decimal,
        currency: &str,
        receipt_email: Option<&str>,
    ) -> Result<Payment, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (order_id, intent_id, amount, currency, receipt_email)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(order_id)
        .bind(intent_id)
        .bind(amount)
        .bind(currency)
        .bind(receipt_email)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "payment intent"))?;

        Ok(payment)
    }

    /// Get a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// Get the payment settling a given order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_order(&self, order_id: OrderId) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE order_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// Get a payment by its gateway intent ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_intent(&self, intent_id: &str) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE intent_id = $1"
        ))
        .bind(intent_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// Update a payment's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such payment exists.
    pub async fn set_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Update a payment's status by gateway intent ID (webhook path).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_status_by_intent(
        &self,
        intent_id: &str,
        status: PaymentStatus,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET status = $2, updated_at = NOW()
             WHERE intent_id = $1
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(intent_id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;

        Ok(payment)
    }

    /// List payments joined with order context for the admin transactions
    /// screen, paginated, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_transactions(
        &self,
        query: &PageQuery,
        status: Option<PaymentStatus>,
    ) -> Result<Page<TransactionListing>, RepositoryError> {
        let column = query.sort_column(SORT_WHITELIST, "p.created_at");
        let dir = query.dir().as_sql();

        let rows = sqlx::query_as::<_, TransactionListing>(&format!(
            "SELECT p.id, p.order_id, p.provider, p.intent_id, p.status, p.amount,
                    p.currency, p.receipt_email, p.created_at, p.updated_at,
                    o.number AS order_number, s.name AS shop_name
             FROM payments p
             JOIN orders o ON o.id = p.order_id
             JOIN shops s ON s.id = o.shop_id
             WHERE $1::payment_status IS NULL OR p.status = $1
             ORDER BY {column} {dir}
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payments WHERE $1::payment_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(rows, total, query))
    }
}
