//! Slug normalization and unique-suffix selection.
//!
//! # Responsibility
//! - Normalize human-readable names into URL-safe slugs.
//! - Pick the next collision-free slug from an existing candidate set.
//!
//! # Invariants
//! - Normalization output contains only `[a-z0-9-]` with no leading,
//!   trailing or doubled separators.
//! - Candidates with a non-numeric tail count as suffix 0, never a parse
//!   error.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-z0-9]+").expect("slug pattern is valid"));

/// Normalizes `name` into a lowercase URL-safe slug with `-` separators.
///
/// Runs of characters outside `[a-z0-9]` collapse into a single separator;
/// names with no usable characters produce an empty string.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Picks the next unique slug given candidates matching `slug` or `slug-%`.
///
/// Rules, in order:
/// 1. a numeric-suffixed candidate with suffix >= 1 exists: `slug-<max+1>`;
/// 2. else the exact unsuffixed slug exists: `slug-1`;
/// 3. else: `slug` unchanged.
pub(crate) fn next_unique_slug(slug: &str, existing: &[String]) -> String {
    let mut exact_match = false;
    let mut max_suffix: u64 = 0;

    for candidate in existing {
        if candidate == slug {
            exact_match = true;
            continue;
        }
        max_suffix = max_suffix.max(numeric_suffix(slug, candidate));
    }

    if max_suffix >= 1 {
        format!("{slug}-{}", max_suffix + 1)
    } else if exact_match {
        format!("{slug}-1")
    } else {
        slug.to_string()
    }
}

/// Extracts the trailing numeric suffix of a `slug-<number>` candidate.
///
/// Candidates that merely share the prefix without a numeric tail map to 0.
fn numeric_suffix(slug: &str, candidate: &str) -> u64 {
    candidate
        .strip_prefix(slug)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(0)
}
