//! Pagination parameters and paged responses.
//!
//! All list endpoints share the same query shape: `limit`, `offset`, an
//! optional whitelisted `sort` field, and a `dir`. Repositories resolve the
//! sort field against their own column whitelist.

use serde::{Deserialize, Serialize};

/// Default page size when `limit` is absent.
const DEFAULT_LIMIT: i64 = 25;
/// Hard ceiling on page size.
const MAX_LIMIT: i64 = 100;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PageQuery {
    /// Page size; clamped to 1..=100, default 25.
    pub limit: Option<i64>,
    /// Rows to skip; negative values clamp to 0.
    pub offset: Option<i64>,
    /// Sort field, resolved against a per-resource whitelist.
    pub sort: Option<String>,
    /// Sort direction, default descending.
    pub dir: Option<SortDir>,
}

impl PageQuery {
    /// Effective page size.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Effective offset.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Effective sort direction.
    #[must_use]
    pub fn dir(&self) -> SortDir {
        self.dir.unwrap_or_default()
    }

    /// Resolve the requested sort field against a whitelist of
    /// `(query name, column)` pairs, falling back to `default_column`.
    #[must_use]
    pub fn sort_column<'a>(
        &self,
        whitelist: &[(&str, &'a str)],
        default_column: &'a str,
    ) -> &'a str {
        self.sort
            .as_deref()
            .and_then(|requested| {
                whitelist
                    .iter()
                    .find(|(name, _)| *name == requested)
                    .map(|(_, column)| *column)
            })
            .unwrap_or(default_column)
    }
}

/// A page of results plus the total row count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Rows in this page.
    pub items: Vec<T>,
    /// Total rows matching the query, ignoring pagination.
    pub total: i64,
    /// Page size used.
    pub limit: i64,
    /// Offset used.
    pub offset: i64,
}

impl<T> Page<T> {
    /// Assemble a page from rows and the total count.
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        Self {
            items,
            total,
            limit: query.limit(),
            offset: query.offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(PageQuery::default().limit(), 25);

        let query = PageQuery {
            limit: Some(100_000),
            ..Default::default()
        };
        assert_eq!(query.limit(), 100);

        let query = PageQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(query.limit(), 1);
    }

    #[test]
    fn negative_offset_clamps_to_zero() {
        let query = PageQuery {
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn sort_column_ignores_unlisted_fields() {
        let whitelist = &[("created_at", "created_at"), ("total", "total")];

        let query = PageQuery {
            sort: Some("total".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort_column(whitelist, "created_at"), "total");

        let query = PageQuery {
            sort: Some("password_hash; DROP TABLE orders".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort_column(whitelist, "created_at"), "created_at");
    }
}
