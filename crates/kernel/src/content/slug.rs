//! Slug allocation.
//!
//! Each content kind has its own slug namespace. A title is slugified and,
//! if the base slug is taken, suffixed with `-1`, `-2`, ... until free.

use std::collections::HashSet;

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::escape_like;
use crate::models::ContentKind;

/// Maximum slug length, matching the column width.
pub const MAX_SLUG_LEN: usize = 255;

/// Base used by auto-save when an item has no title yet.
pub const UNTITLED_SLUG: &str = "untitled";

/// Slugs owned by static routes under `/api/blog`.
pub const RESERVED_SLUGS: &[&str] = &["search", "categories"];

/// Re-allocations tried when a concurrent save claims the same slug.
pub const CONFLICT_RETRIES: usize = 3;

/// A slug was still taken after every re-allocation.
#[derive(Debug, thiserror::Error)]
#[error("the slug {0:?} is already taken")]
pub struct SlugTaken(pub String);

/// Whether `slug` would be shadowed by a static blog route.
pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// Whether `err` is a unique violation on a slug column.
pub fn is_conflict(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => {
            db.is_unique_violation() && db.constraint().is_none_or(|c| c.ends_with("slug_key"))
        }
        _ => false,
    }
}

/// Convert text into a URL slug.
///
/// Lowercases, keeps ASCII letters and digits, turns whitespace, hyphens and
/// underscores into single hyphens, drops everything else, and trims hyphens
/// from both ends. Returns an empty string when nothing survives.
pub fn slugify(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }

    // Result is pure ASCII, so byte offsets are char boundaries.
    if result.len() > MAX_SLUG_LEN {
        let mid_word = result.as_bytes()[MAX_SLUG_LEN] != b'-';
        result.truncate(MAX_SLUG_LEN);
        if mid_word && let Some(pos) = result.rfind('-') {
            result.truncate(pos);
        }
        while result.ends_with('-') {
            result.pop();
        }
    }

    result
}

/// Slugify `source`, substituting `fallback` when the result is empty.
pub fn base_slug(source: &str, fallback: &str) -> String {
    let slug = slugify(source);
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Pick the first free slug for `base` given the slugs already taken.
///
/// Reserved slugs count as taken.
pub fn pick_unique(base: &str, taken: &HashSet<String>) -> String {
    let is_taken = |slug: &str| taken.contains(slug) || is_reserved(slug);
    if !is_taken(base) {
        return base.to_string();
    }

    let mut counter: u64 = 1;
    loop {
        let candidate = format!("{base}-{counter}");
        if !is_taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Slugs in `kind`'s namespace that could collide with `base`.
///
/// The record named by `exclude` is ignored so re-saving an item keeps its
/// own slug.
pub async fn taken_slugs(
    pool: &PgPool,
    kind: ContentKind,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<HashSet<String>> {
    let sql = format!(
        "SELECT slug FROM {} WHERE (slug = $1 OR slug LIKE $2) AND ($3::uuid IS NULL OR id <> $3)",
        kind.table()
    );
    let pattern = format!("{}-%", escape_like(base));

    let rows: Vec<(String,)> = sqlx::query_as(&sql)
        .bind(base)
        .bind(&pattern)
        .bind(exclude)
        .fetch_all(pool)
        .await
        .context("failed to check slug uniqueness")?;

    Ok(rows.into_iter().map(|(s,)| s).collect())
}

/// Allocate a unique slug for `source` within `kind`'s namespace.
///
/// `source` is either a title or an explicitly requested slug; both go
/// through the same normalization and de-duplication.
pub async fn allocate(
    pool: &PgPool,
    kind: ContentKind,
    source: &str,
    fallback: &str,
    exclude: Option<Uuid>,
) -> Result<String> {
    let base = base_slug(source, fallback);
    let taken = taken_slugs(pool, kind, &base, exclude).await?;
    let slug = pick_unique(&base, &taken);

    tracing::debug!(kind = kind.as_str(), base = %base, slug = %slug, "allocated slug");
    Ok(slug)
}
