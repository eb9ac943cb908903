//! Content items: blog posts and static pages.
//!
//! Posts and pages share one record shape and one lifecycle. Each kind lives
//! in its own table, which is also its slug namespace.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::escape_like;
use crate::error::FieldErrors;

/// Maximum length of the SEO meta description.
pub const SEO_DESCRIPTION_MAX: usize = 160;

/// Days an item may sit in the trash before it is eligible for purging.
pub const TRASH_RETENTION_DAYS: i64 = 30;

/// Kind of content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[serde(alias = "posts")]
    Post,
    #[serde(alias = "pages")]
    Page,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
        }
    }

    /// Backing table. Static strings only; never user input.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Page => "pages",
        }
    }

    /// Base slug used when the title slugifies to nothing.
    pub fn fallback_slug(&self) -> &'static str {
        self.as_str()
    }
}

/// Lifecycle state of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentState {
    Draft,
    Published,
    Trashed,
}

impl ContentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Trashed => "trashed",
        }
    }
}

impl From<&str> for ContentState {
    fn from(v: &str) -> Self {
        match v {
            "published" => ContentState::Published,
            "trashed" => ContentState::Trashed,
            _ => ContentState::Draft,
        }
    }
}

/// Content item (post or page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    pub slug: String,
    /// HTML body.
    pub body: String,
    pub excerpt: Option<String>,
    pub state: ContentState,
    pub published_at: Option<DateTime<Utc>>,
    pub trashed_at: Option<DateTime<Utc>>,
    pub trashed_by: Option<Uuid>,
    /// Estimated reading time in minutes.
    pub read_time: i32,
    pub view_count: i64,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub author_id: Option<Uuid>,
    pub is_featured: bool,
    pub featured_image_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a content item.
#[derive(sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    title: String,
    slug: String,
    body: String,
    excerpt: Option<String>,
    state: String,
    published_at: Option<DateTime<Utc>>,
    trashed_at: Option<DateTime<Utc>>,
    trashed_by: Option<Uuid>,
    read_time: i32,
    view_count: i64,
    seo_description: Option<String>,
    seo_keywords: Option<String>,
    author_id: Option<Uuid>,
    is_featured: bool,
    featured_image_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_item(self, kind: ContentKind) -> ContentItem {
        ContentItem {
            id: self.id,
            kind,
            title: self.title,
            slug: self.slug,
            body: self.body,
            excerpt: self.excerpt,
            state: ContentState::from(self.state.as_str()),
            published_at: self.published_at,
            trashed_at: self.trashed_at,
            trashed_by: self.trashed_by,
            read_time: self.read_time,
            view_count: self.view_count,
            seo_description: self.seo_description,
            seo_keywords: self.seo_keywords,
            author_id: self.author_id,
            is_featured: self.is_featured,
            featured_image_id: self.featured_image_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const COLUMNS: &str = "id, title, slug, body, excerpt, state, published_at, trashed_at, trashed_by, \
     read_time, view_count, seo_description, seo_keywords, author_id, is_featured, \
     featured_image_id, created_at, updated_at";

/// Fully resolved values for inserting a content item.
///
/// Slug and read time are computed by the caller before insertion.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub excerpt: Option<String>,
    pub state: ContentState,
    pub published_at: Option<DateTime<Utc>>,
    pub read_time: i32,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub author_id: Option<Uuid>,
    pub is_featured: bool,
    pub featured_image_id: Option<Uuid>,
}

/// Editable fields submitted by the dashboard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub body: Option<String>,
    pub excerpt: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub is_featured: Option<bool>,
    pub featured_image_id: Option<Uuid>,
    /// Category ids (posts only).
    pub categories: Option<Vec<Uuid>>,
}

impl ContentInput {
    /// Validate a full (non-autosave) submission.
    ///
    /// Returns field-level messages; an empty map means valid.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self
            .title
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty()
        {
            errors
                .entry("title".to_string())
                .or_default()
                .push("This field is required.".to_string());
        }

        errors.extend(self.validate_seo());
        errors
    }

    /// Validate only the length-bounded SEO field (used by auto-save).
    pub fn validate_seo(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(desc) = &self.seo_description
            && desc.chars().count() > SEO_DESCRIPTION_MAX
        {
            errors.insert(
                "seo_description".to_string(),
                vec![format!(
                    "Meta description should not exceed {SEO_DESCRIPTION_MAX} characters."
                )],
            );
        }
        errors
    }
}

/// Filters for the dashboard listing.
#[derive(Debug, Clone, Default)]
pub struct AdminFilter {
    /// Show trashed items instead of active ones.
    pub trash: bool,
    pub state: Option<ContentState>,
    pub author_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// Restrict to a published month.
    pub month: Option<(i32, u32)>,
    pub search: Option<String>,
}

/// Counts shown on the dashboard status tabs.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct TabCounts {
    pub all: i64,
    pub mine: i64,
    pub published: i64,
    pub draft: i64,
    pub trash: i64,
}

impl ContentItem {
    pub fn is_trashed(&self) -> bool {
        self.state == ContentState::Trashed
    }

    pub fn is_published(&self) -> bool {
        self.state == ContentState::Published
    }

    /// Whole days spent in the trash, or 0 when not trashed.
    pub fn days_in_trash(&self, now: DateTime<Utc>) -> i64 {
        match (self.state, self.trashed_at) {
            (ContentState::Trashed, Some(at)) => (now - at).num_days(),
            _ => 0,
        }
    }

    /// Whether the retention window has elapsed. Advisory only.
    pub fn can_auto_delete(&self, now: DateTime<Utc>) -> bool {
        self.days_in_trash(now) >= TRASH_RETENTION_DAYS
    }

    /// Find an item by ID in any state.
    pub async fn find_by_id(pool: &PgPool, kind: ContentKind, id: Uuid) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", kind.table());
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch content by id")?;

        Ok(row.map(|r| r.into_item(kind)))
    }

    /// Find a published item by slug.
    pub async fn find_published_by_slug(
        pool: &PgPool,
        kind: ContentKind,
        slug: &str,
    ) -> Result<Option<Self>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE slug = $1 AND state = 'published'",
            kind.table()
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await
            .context("failed to fetch content by slug")?;

        Ok(row.map(|r| r.into_item(kind)))
    }

    /// Insert a new item.
    pub async fn create(pool: &PgPool, kind: ContentKind, input: NewContent) -> Result<Self> {
        let id = Uuid::now_v7();
        let sql = format!(
            r#"
            INSERT INTO {} (id, title, slug, body, excerpt, state, published_at, read_time,
                            seo_description, seo_keywords, author_id, is_featured, featured_image_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {COLUMNS}
            "#,
            kind.table()
        );

        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.body)
            .bind(&input.excerpt)
            .bind(input.state.as_str())
            .bind(input.published_at)
            .bind(input.read_time)
            .bind(&input.seo_description)
            .bind(&input.seo_keywords)
            .bind(input.author_id)
            .bind(input.is_featured)
            .bind(input.featured_image_id)
            .fetch_one(pool)
            .await
            .context("failed to create content")?;

        Ok(row.into_item(kind))
    }

    /// Persist editable fields of an existing item.
    ///
    /// Writes everything except id, author, view count and creation time.
    /// Returns None if the item no longer exists.
    pub async fn save(&self, pool: &PgPool) -> Result<Option<Self>> {
        let sql = format!(
            r#"
            UPDATE {}
            SET title = $1, slug = $2, body = $3, excerpt = $4, state = $5, published_at = $6,
                read_time = $7, seo_description = $8, seo_keywords = $9, is_featured = $10,
                featured_image_id = $11, trashed_at = $12, trashed_by = $13, updated_at = now()
            WHERE id = $14
            RETURNING {COLUMNS}
            "#,
            self.kind.table()
        );

        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(&self.title)
            .bind(&self.slug)
            .bind(&self.body)
            .bind(&self.excerpt)
            .bind(self.state.as_str())
            .bind(self.published_at)
            .bind(self.read_time)
            .bind(&self.seo_description)
            .bind(&self.seo_keywords)
            .bind(self.is_featured)
            .bind(self.featured_image_id)
            .bind(self.trashed_at)
            .bind(self.trashed_by)
            .bind(self.id)
            .fetch_optional(pool)
            .await
            .context("failed to update content")?;

        Ok(row.map(|r| r.into_item(self.kind)))
    }

    /// Dashboard listing with filters, newest first.
    pub async fn list_admin(
        pool: &PgPool,
        kind: ContentKind,
        filter: &AdminFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let (where_sql, month_start, month_end) = admin_where(filter);
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE {where_sql} ORDER BY created_at DESC LIMIT $8 OFFSET $9",
            kind.table()
        );

        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(filter.trash)
            .bind(filter.state.map(|s| s.as_str()))
            .bind(filter.author_id)
            .bind(filter.search.as_deref().map(|s| format!("%{}%", escape_like(s))))
            .bind(month_start)
            .bind(month_end)
            .bind(filter.category_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to list content")?;

        Ok(rows.into_iter().map(|r| r.into_item(kind)).collect())
    }

    /// Count matching the dashboard filters.
    pub async fn count_admin(pool: &PgPool, kind: ContentKind, filter: &AdminFilter) -> Result<i64> {
        let (where_sql, month_start, month_end) = admin_where(filter);
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {where_sql}", kind.table());

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.trash)
            .bind(filter.state.map(|s| s.as_str()))
            .bind(filter.author_id)
            .bind(filter.search.as_deref().map(|s| format!("%{}%", escape_like(s))))
            .bind(month_start)
            .bind(month_end)
            .bind(filter.category_id)
            .fetch_one(pool)
            .await
            .context("failed to count content")?;

        Ok(count)
    }

    /// Status tab counts for the dashboard.
    pub async fn tab_counts(pool: &PgPool, kind: ContentKind, user_id: Uuid) -> Result<TabCounts> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE state <> 'trashed') AS all,
                COUNT(*) FILTER (WHERE state <> 'trashed' AND author_id = $1) AS mine,
                COUNT(*) FILTER (WHERE state = 'published') AS published,
                COUNT(*) FILTER (WHERE state = 'draft') AS draft,
                COUNT(*) FILTER (WHERE state = 'trashed') AS trash
            FROM {}
            "#,
            kind.table()
        );

        let counts = sqlx::query_as::<_, TabCounts>(&sql)
            .bind(user_id)
            .fetch_one(pool)
            .await
            .context("failed to count content tabs")?;

        Ok(counts)
    }

    /// Count published items of a kind.
    pub async fn count_published(pool: &PgPool, kind: ContentKind) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE state = 'published'",
            kind.table()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(pool)
            .await
            .context("failed to count published content")?;

        Ok(count)
    }

    /// Featured published posts, newest first.
    pub async fn featured_posts(pool: &PgPool, limit: i64) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM posts WHERE state = 'published' AND is_featured \
             ORDER BY published_at DESC NULLS LAST LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("failed to list featured posts")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_item(ContentKind::Post))
            .collect())
    }

    /// Published posts, newest first, excluding the given ids.
    pub async fn list_published_posts(
        pool: &PgPool,
        exclude: &[Uuid],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM posts WHERE state = 'published' AND NOT (id = ANY($1)) \
             ORDER BY published_at DESC NULLS LAST LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(exclude)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to list published posts")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_item(ContentKind::Post))
            .collect())
    }

    /// Count published posts, excluding the given ids.
    pub async fn count_published_posts(pool: &PgPool, exclude: &[Uuid]) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE state = 'published' AND NOT (id = ANY($1))",
        )
        .bind(exclude)
        .fetch_one(pool)
        .await
        .context("failed to count published posts")?;

        Ok(count)
    }

    /// Published posts by one author.
    pub async fn list_by_author(
        pool: &PgPool,
        author_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM posts WHERE state = 'published' AND author_id = $1 \
             ORDER BY published_at DESC NULLS LAST LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(author_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to list posts by author")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_item(ContentKind::Post))
            .collect())
    }

    /// Count published posts by one author.
    pub async fn count_by_author(pool: &PgPool, author_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE state = 'published' AND author_id = $1",
        )
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("failed to count posts by author")?;

        Ok(count)
    }

    /// Published posts in a category.
    pub async fn list_in_category(
        pool: &PgPool,
        category_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM posts
            WHERE state = 'published'
              AND id IN (SELECT post_id FROM post_categories WHERE category_id = $1)
            ORDER BY published_at DESC NULLS LAST
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(category_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to list posts in category")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_item(ContentKind::Post))
            .collect())
    }

    /// Count published posts in a category.
    pub async fn count_in_category(pool: &PgPool, category_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM posts
            WHERE state = 'published'
              AND id IN (SELECT post_id FROM post_categories WHERE category_id = $1)
            "#,
        )
        .bind(category_id)
        .fetch_one(pool)
        .await
        .context("failed to count posts in category")?;

        Ok(count)
    }

    /// Published posts sharing at least one category with the given post.
    pub async fn related_posts(pool: &PgPool, post_id: Uuid, limit: i64) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM posts
            WHERE state = 'published' AND id <> $1
              AND id IN (
                SELECT pc.post_id FROM post_categories pc
                WHERE pc.category_id IN (SELECT category_id FROM post_categories WHERE post_id = $1)
              )
            ORDER BY published_at DESC NULLS LAST
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(post_id)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("failed to list related posts")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_item(ContentKind::Post))
            .collect())
    }

    /// Search published posts by title, body or excerpt.
    ///
    /// Ranked by relevance (exact title 3, title contains 2, otherwise 1),
    /// then newest first.
    pub async fn search_published(
        pool: &PgPool,
        keyword: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM posts
            WHERE state = 'published'
              AND (title ILIKE $1 OR body ILIKE $1 OR excerpt ILIKE $1)
            ORDER BY
              CASE
                WHEN lower(title) = lower($2) THEN 3
                WHEN title ILIKE $1 THEN 2
                ELSE 1
              END DESC,
              published_at DESC NULLS LAST
            LIMIT $3 OFFSET $4
            "#
        );
        let pattern = format!("%{}%", escape_like(keyword));
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(&pattern)
            .bind(keyword)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to search posts")?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_item(ContentKind::Post))
            .collect())
    }

    /// Count search matches.
    pub async fn count_search(pool: &PgPool, keyword: &str) -> Result<i64> {
        let pattern = format!("%{}%", escape_like(keyword));
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM posts
            WHERE state = 'published'
              AND (title ILIKE $1 OR body ILIKE $1 OR excerpt ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await
        .context("failed to count search results")?;

        Ok(count)
    }

    /// Increment the view counter.
    pub async fn increment_views(pool: &PgPool, kind: ContentKind, id: Uuid) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET view_count = view_count + 1 WHERE id = $1",
            kind.table()
        );
        sqlx::query(&sql)
            .bind(id)
            .execute(pool)
            .await
            .context("failed to increment view count")?;

        Ok(())
    }

    /// The subset of `ids` written by `author_id`.
    pub async fn owned_ids(
        pool: &PgPool,
        kind: ContentKind,
        ids: &[Uuid],
        author_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let sql = format!(
            "SELECT id FROM {} WHERE id = ANY($1) AND author_id = $2",
            kind.table()
        );
        let owned: Vec<Uuid> = sqlx::query_scalar(&sql)
            .bind(ids)
            .bind(author_id)
            .fetch_all(pool)
            .await
            .context("failed to check content ownership")?;

        Ok(owned)
    }
}

/// WHERE clause shared by the dashboard list and count queries.
///
/// Parameters: $1 trash flag, $2 state, $3 author, $4 search pattern,
/// $5/$6 month window, $7 category.
fn admin_where(
    filter: &AdminFilter,
) -> (
    &'static str,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
) {
    let (start, end) = filter
        .month
        .and_then(|(y, m)| month_window(y, m))
        .map_or((None, None), |(s, e)| (Some(s), Some(e)));

    (
        "(state = 'trashed') = $1 \
         AND ($2::text IS NULL OR state = $2) \
         AND ($3::uuid IS NULL OR author_id = $3) \
         AND ($4::text IS NULL OR title ILIKE $4 OR body ILIKE $4 OR excerpt ILIKE $4) \
         AND ($5::timestamptz IS NULL OR (published_at >= $5 AND published_at < $6)) \
         AND ($7::uuid IS NULL OR id IN (SELECT post_id FROM post_categories WHERE category_id = $7))",
        start,
        end,
    )
}

/// Half-open `[start, end)` UTC window covering one calendar month.
pub fn month_window(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    use chrono::NaiveDate;

    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    Some((
        start.and_hms_opt(0, 0, 0)?.and_utc(),
        end.and_hms_opt(0, 0, 0)?.and_utc(),
    ))
}

/// Parse a `YYYY-MM` month filter.
pub fn parse_month(value: &str) -> Option<(i32, u32)> {
    let (year, month) = value.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn item(state: ContentState) -> ContentItem {
        let now = Utc::now();
        ContentItem {
            id: Uuid::now_v7(),
            kind: ContentKind::Post,
            title: "Hello".to_string(),
            slug: "hello".to_string(),
            body: String::new(),
            excerpt: None,
            state,
            published_at: None,
            trashed_at: None,
            trashed_by: None,
            read_time: 0,
            view_count: 0,
            seo_description: None,
            seo_keywords: None,
            author_id: None,
            is_featured: false,
            featured_image_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn kind_tables_are_distinct() {
        assert_eq!(ContentKind::Post.table(), "posts");
        assert_eq!(ContentKind::Page.table(), "pages");
        assert_eq!(ContentKind::Page.fallback_slug(), "page");
    }

    #[test]
    fn kind_deserializes_plural_alias() {
        let kind: ContentKind = serde_json::from_str("\"posts\"").unwrap();
        assert_eq!(kind, ContentKind::Post);
        let kind: ContentKind = serde_json::from_str("\"page\"").unwrap();
        assert_eq!(kind, ContentKind::Page);
    }

    #[test]
    fn state_conversion() {
        assert_eq!(ContentState::from("published"), ContentState::Published);
        assert_eq!(ContentState::from("trashed"), ContentState::Trashed);
        assert_eq!(ContentState::from("draft"), ContentState::Draft);
        assert_eq!(ContentState::from("bogus"), ContentState::Draft);
    }

    #[test]
    fn seo_description_limit() {
        let input = ContentInput {
            title: Some("Title".to_string()),
            seo_description: Some("x".repeat(161)),
            ..Default::default()
        };
        let errors = input.validate();
        assert!(errors.contains_key("seo_description"));
        assert!(!errors.contains_key("title"));

        let ok = ContentInput {
            title: Some("Title".to_string()),
            seo_description: Some("é".repeat(160)),
            ..Default::default()
        };
        assert!(ok.validate().is_empty());
    }

    #[test]
    fn title_required_on_full_save() {
        let input = ContentInput {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(input.validate().contains_key("title"));
        assert!(input.validate_seo().is_empty());
    }

    #[test]
    fn trash_retention_window() {
        let now = Utc::now();
        let mut trashed = item(ContentState::Trashed);
        trashed.trashed_at = Some(now - Duration::days(29));
        assert_eq!(trashed.days_in_trash(now), 29);
        assert!(!trashed.can_auto_delete(now));

        trashed.trashed_at = Some(now - Duration::days(30));
        assert!(trashed.can_auto_delete(now));

        let draft = item(ContentState::Draft);
        assert_eq!(draft.days_in_trash(now), 0);
    }

    #[test]
    fn month_parsing_and_window() {
        assert_eq!(parse_month("2026-03"), Some((2026, 3)));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("all"), None);

        let (start, end) = month_window(2025, 12).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }
}
