//! List-query parameters.
//!
//! # Responsibility
//! - Define the typed query specification accepted by `list`.
//! - Normalize page-size input according to the pagination contract.
//!
//! # Invariants
//! - `list` never mutates caller parameters; canonical sort resolution
//!   happens repository-side.
//! - Unknown field names inside filters/select are dropped by the
//!   repository, never rejected here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default page size when the caller supplies none (or zero).
pub const DEFAULT_LIMIT: u32 = 15;
/// Hard page-size ceiling.
pub const LIMIT_MAX: u32 = 100;

/// Sort direction for the canonical sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Value side of one compound filter entry.
///
/// A sequence OR-combines substring matches; a scalar is a single substring
/// match, with empty / `"null"` meaning an `IS NULL` check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

/// Typed query specification for [`list`](crate::repo::Repository::list).
///
/// Field names mirror the wire-level query keys; `where` maps to
/// [`ListParams::where_any`] because of the Rust keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// Requested sort column; falls back to `id` when missing or unknown.
    pub sort_field: Option<String>,
    /// Sort direction; ordering is applied only when present.
    pub sort_by: Option<SortDirection>,
    /// Single equality filter column, ignored when not a real column.
    pub filter_field: Option<String>,
    /// Value for `filter_field`.
    pub filter_value: Option<String>,
    /// Compound filters keyed by column name or `relation.column` path.
    pub filter: BTreeMap<String, FilterValue>,
    /// Presence filters: `true` keeps non-null rows, `false` keeps null rows.
    pub has: BTreeMap<String, bool>,
    /// Free-text search applied across every entity column.
    pub q: Option<String>,
    /// Inclusive `created_at` lower bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive `created_at` upper bound, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    /// Relation names to eager-load onto each returned record.
    pub with_relationship: Vec<String>,
    /// Ordered `[column, value]` pairs OR-combined with the other filters.
    #[serde(rename = "where")]
    pub where_any: Vec<(String, String)>,
    /// Comma-separated projection; unknown columns are dropped.
    pub select: Option<String>,
    /// Page size; normalized through [`normalize_limit`].
    pub limit: Option<u32>,
    /// One-based page number echoed into navigation links.
    pub page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            sort_field: None,
            sort_by: None,
            filter_field: None,
            filter_value: None,
            filter: BTreeMap::new(),
            has: BTreeMap::new(),
            q: None,
            start_date: None,
            end_date: None,
            with_relationship: Vec::new(),
            where_any: Vec::new(),
            select: None,
            limit: None,
            page: 1,
        }
    }
}

impl ListParams {
    /// Returns the one-based page, treating 0 as the first page.
    pub(crate) fn current_page(&self) -> u32 {
        self.page.max(1)
    }
}

/// Normalizes a requested page size to the pagination contract.
///
/// `None` and `Some(0)` mean the default; anything above the ceiling clamps.
pub fn normalize_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => DEFAULT_LIMIT,
        Some(value) if value > LIMIT_MAX => LIMIT_MAX,
        Some(value) => value,
    }
}
