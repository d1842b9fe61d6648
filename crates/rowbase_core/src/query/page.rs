//! Paginated result shaping and navigation-link echoes.
//!
//! # Responsibility
//! - Bundle one result slice with totals and page math.
//! - Rebuild caller parameters into percent-encoded link query strings.
//!
//! # Invariants
//! - Parameter echo order is canonical, so identical parameters always
//!   produce identical links.
//! - Only parameters the caller actually provided are echoed.

use crate::model::record::Record;
use crate::query::params::{FilterValue, ListParams};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

// RFC 3986 unreserved characters stay readable in links.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Navigation links for one result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// One bounded result slice plus pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records for the current page.
    pub items: Vec<Record>,
    /// Total row count across all pages of the same query.
    pub total: u64,
    /// Page size used for the slice.
    pub per_page: u32,
    /// One-based page number of this slice.
    pub current_page: u32,
    /// One-based last page number (at least 1, even when empty).
    pub last_page: u32,
    /// Navigation links echoing the caller's parameters.
    pub links: PageLinks,
}

impl Page {
    /// Assembles a page from fetched items and the producing parameters.
    pub(crate) fn assemble(
        items: Vec<Record>,
        total: u64,
        per_page: u32,
        params: &ListParams,
        base_path: &str,
    ) -> Self {
        let current_page = params.current_page();
        let last_page = last_page(total, per_page);
        let url = |page: u32| page_url(base_path, params, page);

        let links = PageLinks {
            first: url(1),
            last: url(last_page),
            prev: (current_page > 1).then(|| url(current_page - 1)),
            next: (current_page < last_page).then(|| url(current_page + 1)),
        };

        Self {
            items,
            total,
            per_page,
            current_page,
            last_page,
            links,
        }
    }
}

fn last_page(total: u64, per_page: u32) -> u32 {
    if total == 0 {
        return 1;
    }
    total
        .div_ceil(u64::from(per_page.max(1)))
        .try_into()
        .unwrap_or(u32::MAX)
}

fn page_url(base_path: &str, params: &ListParams, page: u32) -> String {
    format!("{base_path}?{}", echo_query(params, page))
}

/// Serializes provided parameters into a canonical query string ending with
/// the target `page`.
fn echo_query(params: &ListParams, page: u32) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut push = |key: String, value: &str| {
        pairs.push((key, encode(value)));
    };

    if let Some(sort_field) = &params.sort_field {
        push("sort_field".to_string(), sort_field);
    }
    if let Some(sort_by) = params.sort_by {
        push("sort_by".to_string(), sort_by.as_str());
    }
    if let Some(filter_field) = &params.filter_field {
        push("filter_field".to_string(), filter_field);
    }
    if let Some(filter_value) = &params.filter_value {
        push("filter_value".to_string(), filter_value);
    }
    for (key, value) in &params.filter {
        match value {
            FilterValue::One(value) => {
                push(format!("filter[{}]", encode(key)), value);
            }
            FilterValue::Many(values) => {
                for value in values {
                    push(format!("filter[{}][]", encode(key)), value);
                }
            }
        }
    }
    for (key, present) in &params.has {
        push(
            format!("has[{}]", encode(key)),
            if *present { "true" } else { "false" },
        );
    }
    if let Some(q) = &params.q {
        push("q".to_string(), q);
    }
    if let Some(start_date) = &params.start_date {
        push("start_date".to_string(), start_date);
    }
    if let Some(end_date) = &params.end_date {
        push("end_date".to_string(), end_date);
    }
    for relation in &params.with_relationship {
        push("with_relationship[]".to_string(), relation);
    }
    for (index, (column, value)) in params.where_any.iter().enumerate() {
        push(format!("where[{index}][0]"), column);
        push(format!("where[{index}][1]"), value);
    }
    if let Some(select) = &params.select {
        push("select".to_string(), select);
    }
    if let Some(limit) = params.limit {
        push("limit".to_string(), &limit.to_string());
    }
    push("page".to_string(), &page.to_string());

    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE).to_string()
}

#[cfg(test)]
mod tests {
    use super::{echo_query, last_page, Page};
    use crate::query::params::{FilterValue, ListParams, SortDirection};

    #[test]
    fn last_page_math_covers_empty_and_partial_pages() {
        assert_eq!(last_page(0, 15), 1);
        assert_eq!(last_page(15, 15), 1);
        assert_eq!(last_page(16, 15), 2);
    }

    #[test]
    fn echo_is_deterministic_and_percent_encoded() {
        let mut params = ListParams {
            sort_field: Some("title".to_string()),
            sort_by: Some(SortDirection::Desc),
            q: Some("hello world".to_string()),
            limit: Some(10),
            ..ListParams::default()
        };
        params.filter.insert(
            "author.name".to_string(),
            FilterValue::One("Jane Doe".to_string()),
        );

        let first = echo_query(&params, 2);
        let second = echo_query(&params, 2);
        assert_eq!(first, second);
        assert_eq!(
            first,
            "sort_field=title&sort_by=desc&filter[author.name]=Jane%20Doe\
             &q=hello%20world&limit=10&page=2"
        );
    }

    #[test]
    fn sequence_filters_echo_one_pair_per_value() {
        let mut params = ListParams::default();
        params.filter.insert(
            "status".to_string(),
            FilterValue::Many(vec!["true".to_string(), "false".to_string()]),
        );

        let query = echo_query(&params, 1);
        assert_eq!(query, "filter[status][]=true&filter[status][]=false&page=1");
    }

    #[test]
    fn links_cover_page_boundaries() {
        let params = ListParams {
            limit: Some(2),
            page: 2,
            ..ListParams::default()
        };
        let page = Page::assemble(Vec::new(), 5, 2, &params, "/api/posts");

        assert_eq!(page.last_page, 3);
        assert_eq!(page.links.first, "/api/posts?limit=2&page=1");
        assert_eq!(page.links.prev.as_deref(), Some("/api/posts?limit=2&page=1"));
        assert_eq!(page.links.next.as_deref(), Some("/api/posts?limit=2&page=3"));
        assert_eq!(page.links.last, "/api/posts?limit=2&page=3");
    }
}
