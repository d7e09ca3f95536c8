//! Review repository.

use sqlx::PgPool;

use portobello_core::{OrderId, ProductId, ReviewId, ReviewStatus, UserId};

use super::RepositoryError;
use crate::models::{Page, PageQuery, Review};

const REVIEW_COLUMNS: &str =
    "id, product_id, order_id, user_id, rating, title, body, status, created_at, updated_at";

/// Parameters for creating a review.
#[derive(Debug)]
pub struct CreateReview<'a> {
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub user_id: Option<UserId>,
    pub rating: i16,
    pub title: Option<&'a str>,
    pub body: &'a str,
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the (product, order) pair has
    /// already been reviewed.
    pub async fn create(&self, params: CreateReview<'_>) -> Result<Review, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (product_id, order_id, user_id, rating, title, body)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(params.product_id)
        .bind(params.order_id)
        .bind(params.user_id)
        .bind(params.rating)
        .bind(params.title)
        .bind(params.body)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "review for this purchase"))?;

        Ok(review)
    }

    /// List published reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_published(
        &self,
        product_id: ProductId,
        query: &PageQuery,
    ) -> Result<Page<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE product_id = $1 AND status = 'published'
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(product_id)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE product_id = $1 AND status = 'published'",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(rows, total, query))
    }

    /// List reviews by moderation status for the admin queue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_status(
        &self,
        status: ReviewStatus,
        query: &PageQuery,
    ) -> Result<Page<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews
             WHERE status = $1
             ORDER BY created_at ASC
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE status = $1")
            .bind(status)
            .fetch_one(self.pool)
            .await?;

        Ok(Page::new(rows, total, query))
    }

    /// Move a review to a new moderation status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such review exists.
    pub async fn set_status(
        &self,
        id: ReviewId,
        status: ReviewStatus,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
