//! Tax rate repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use portobello_core::TaxRateId;

use super::RepositoryError;
use crate::models::{Page, PageQuery, TaxRate};

const SORT_WHITELIST: &[(&str, &str)] = &[
    ("created_at", "created_at"),
    ("country", "country"),
    ("rate", "rate"),
];

const RATE_COLUMNS: &str =
    "id, country, region, rate, inclusive, active, created_at, updated_at";

/// Fields accepted by [`TaxRateRepository::update`].
#[derive(Debug, Default)]
pub struct TaxRateUpdate {
    pub rate: Option<Decimal>,
    pub inclusive: Option<bool>,
    pub active: Option<bool>,
}

/// Repository for admin-managed tax rates.
pub struct TaxRateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TaxRateRepository<'a> {
    /// Create a new tax rate repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List tax rates, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &PageQuery) -> Result<Page<TaxRate>, RepositoryError> {
        let column = query.sort_column(SORT_WHITELIST, "country");
        let dir = query.dir().as_sql();

        let rows = sqlx::query_as::<_, TaxRate>(&format!(
            "SELECT {RATE_COLUMNS} FROM tax_rates
             ORDER BY {column} {dir}
             LIMIT $1 OFFSET $2"
        ))
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tax_rates")
            .fetch_one(self.pool)
            .await?;

        Ok(Page::new(rows, total, query))
    }

    /// Resolve the active rate for a destination, preferring a
    /// (country, region) row over a country-wide row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve(
        &self,
        country: &str,
        region: Option<&str>,
    ) -> Result<Option<TaxRate>, RepositoryError> {
        let rate = sqlx::query_as::<_, TaxRate>(&format!(
            "SELECT {RATE_COLUMNS} FROM tax_rates
             WHERE country = $1 AND active = TRUE
               AND (region = $2 OR region IS NULL)
             ORDER BY region NULLS LAST
             LIMIT 1"
        ))
        .bind(country)
        .bind(region)
        .fetch_optional(self.pool)
        .await?;

        Ok(rate)
    }

    /// Create a tax rate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a rate for the same
    /// (country, region) already exists.
    pub async fn create(
        &self,
        country: &str,
        region: Option<&str>,
        rate: Decimal,
        inclusive: bool,
    ) -> Result<TaxRate, RepositoryError> {
        let row = sqlx::query_as::<_, TaxRate>(&format!(
            "INSERT INTO tax_rates (country, region, rate, inclusive)
             VALUES ($1, $2, $3, $4)
             RETURNING {RATE_COLUMNS}"
        ))
        .bind(country)
        .bind(region)
        .bind(rate)
        .bind(inclusive)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "tax rate for destination"))?;

        Ok(row)
    }

    /// Apply a partial update to a tax rate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such rate exists.
    pub async fn update(
        &self,
        id: TaxRateId,
        update: TaxRateUpdate,
    ) -> Result<TaxRate, RepositoryError> {
        sqlx::query_as::<_, TaxRate>(&format!(
            "UPDATE tax_rates SET
                 rate = COALESCE($2, rate),
                 inclusive = COALESCE($3, inclusive),
                 active = COALESCE($4, active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {RATE_COLUMNS}"
        ))
        .bind(id)
        .bind(update.rate)
        .bind(update.inclusive)
        .bind(update.active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a tax rate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such rate exists.
    pub async fn delete(&self, id: TaxRateId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_rates WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
