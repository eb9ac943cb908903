//! Content save paths: full save from the editor and auto-save.
//!
//! Every save recomputes read time and keeps the slug unique within the
//! item's kind.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::lifecycle::Transition;
use super::{slug, text};
use crate::models::{Category, ContentInput, ContentItem, ContentKind, ContentState, NewContent};

/// What the editor's submit button asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Publish,
    Draft,
}

/// Service for creating and editing posts and pages.
#[derive(Clone)]
pub struct ContentService {
    inner: Arc<ContentServiceInner>,
}

struct ContentServiceInner {
    pool: PgPool,
}

impl ContentService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            inner: Arc::new(ContentServiceInner { pool }),
        }
    }

    fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Create an item from a validated editor submission.
    pub async fn create(
        &self,
        kind: ContentKind,
        input: ContentInput,
        action: SaveAction,
        author_id: Uuid,
    ) -> Result<ContentItem> {
        let title = input.title.as_deref().unwrap_or_default().trim().to_string();
        let slug_source = requested_slug(&input).unwrap_or(&title).to_string();
        let slug = slug::allocate(self.pool(), kind, &slug_source, kind.fallback_slug(), None).await?;
        let body = input.body.unwrap_or_default();

        let (state, published_at) = match action {
            SaveAction::Publish => (
                ContentState::Published,
                Some(input.published_at.unwrap_or_else(Utc::now)),
            ),
            SaveAction::Draft => (ContentState::Draft, input.published_at),
        };

        let new = NewContent {
            title,
            slug,
            read_time: text::read_time(&body),
            body,
            excerpt: non_empty(input.excerpt),
            state,
            published_at,
            seo_description: non_empty(input.seo_description),
            seo_keywords: non_empty(input.seo_keywords),
            author_id: Some(author_id),
            is_featured: kind == ContentKind::Post && input.is_featured.unwrap_or(false),
            featured_image_id: input.featured_image_id.filter(|_| kind == ContentKind::Post),
        };
        let item = self
            .insert(kind, new, &slug_source, kind.fallback_slug())
            .await?;
        self.set_categories(&item, input.categories.as_deref()).await?;

        info!(kind = kind.as_str(), id = %item.id, slug = %item.slug, state = item.state.as_str(), "content created");
        Ok(item)
    }

    /// Apply a validated editor submission to an existing item.
    ///
    /// Returns None if the item vanished before the write.
    pub async fn update(
        &self,
        mut item: ContentItem,
        input: ContentInput,
        action: Option<SaveAction>,
    ) -> Result<Option<ContentItem>> {
        let kind = item.kind;

        apply_fields(&mut item, &input);
        if input.published_at.is_some() {
            item.published_at = input.published_at;
        }
        if kind == ContentKind::Post {
            if let Some(featured) = input.is_featured {
                item.is_featured = featured;
            }
            if input.featured_image_id.is_some() {
                item.featured_image_id = input.featured_image_id;
            }
        }

        // An explicit slug is normalized and de-duplicated; a cleared slug is
        // regenerated from the title.
        let slug_source = match input.slug.as_deref().map(str::trim) {
            Some("") => Some(item.title.clone()),
            Some(requested) if requested != item.slug => Some(requested.to_string()),
            _ => None,
        };
        if let Some(source) = &slug_source {
            item.slug =
                slug::allocate(self.pool(), kind, source, kind.fallback_slug(), Some(item.id)).await?;
        }

        let now = Utc::now();
        match action {
            Some(SaveAction::Publish) => {
                item.apply(Transition::Publish, None, now);
            }
            Some(SaveAction::Draft) => {
                item.apply(Transition::Draft, None, now);
            }
            None => {}
        }

        item.read_time = text::read_time(&item.body);

        let saved = self
            .persist(item, slug_source.as_deref(), kind.fallback_slug())
            .await?;

        if let Some(saved) = &saved {
            self.set_categories(saved, input.categories.as_deref()).await?;
            info!(kind = kind.as_str(), id = %saved.id, slug = %saved.slug, "content updated");
        }

        Ok(saved)
    }

    /// Auto-save the editor's in-progress fields.
    ///
    /// Creates a draft when `id` is None. The title may be blank; the slug
    /// then falls back to `untitled`. An existing item always ends up a
    /// draft, with its slug taken from the submitted slug or else the
    /// submitted title.
    pub async fn autosave(
        &self,
        kind: ContentKind,
        id: Option<Uuid>,
        input: ContentInput,
        author_id: Uuid,
    ) -> Result<Option<ContentItem>> {
        let Some(id) = id else {
            let title = input.title.as_deref().unwrap_or_default().trim().to_string();
            let slug_source = requested_slug(&input).unwrap_or(&title).to_string();
            let slug =
                slug::allocate(self.pool(), kind, &slug_source, slug::UNTITLED_SLUG, None).await?;
            let body = input.body.clone().unwrap_or_default();

            let new = NewContent {
                title,
                slug,
                read_time: text::read_time(&body),
                body,
                excerpt: non_empty(input.excerpt.clone()),
                state: ContentState::Draft,
                published_at: None,
                seo_description: non_empty(input.seo_description.clone()),
                seo_keywords: non_empty(input.seo_keywords.clone()),
                author_id: Some(author_id),
                is_featured: false,
                featured_image_id: None,
            };
            let item = self
                .insert(kind, new, &slug_source, slug::UNTITLED_SLUG)
                .await?;
            self.set_categories(&item, input.categories.as_deref()).await?;

            info!(kind = kind.as_str(), id = %item.id, "auto-save created draft");
            return Ok(Some(item));
        };

        let Some(mut item) = ContentItem::find_by_id(self.pool(), kind, id).await? else {
            return Ok(None);
        };

        apply_fields(&mut item, &input);

        let slug_source = requested_slug(&input)
            .map(str::to_string)
            .or_else(|| (!item.title.is_empty() && input.title.is_some()).then(|| item.title.clone()))
            .or_else(|| item.slug.is_empty().then(|| item.title.clone()));
        if let Some(source) = &slug_source {
            item.slug =
                slug::allocate(self.pool(), kind, source, slug::UNTITLED_SLUG, Some(item.id))
                    .await?;
        }

        force_draft(&mut item, Utc::now());
        item.read_time = text::read_time(&item.body);

        let saved = self
            .persist(item, slug_source.as_deref(), slug::UNTITLED_SLUG)
            .await?;
        if let Some(saved) = &saved {
            self.set_categories(saved, input.categories.as_deref()).await?;
            info!(kind = kind.as_str(), id = %saved.id, slug = %saved.slug, "auto-saved");
        }
        Ok(saved)
    }

    async fn set_categories(&self, item: &ContentItem, categories: Option<&[Uuid]>) -> Result<()> {
        if item.kind == ContentKind::Post
            && let Some(categories) = categories
        {
            Category::set_for_post(self.pool(), item.id, categories).await?;
        }
        Ok(())
    }

    /// Insert `new`, re-allocating its slug when a concurrent save took it.
    async fn insert(
        &self,
        kind: ContentKind,
        mut new: NewContent,
        slug_source: &str,
        fallback: &str,
    ) -> Result<ContentItem> {
        let mut retries = 0;
        loop {
            match ContentItem::create(self.pool(), kind, new.clone()).await {
                Err(e) if slug::is_conflict(&e) => {
                    if retries == slug::CONFLICT_RETRIES {
                        return Err(slug::SlugTaken(new.slug).into());
                    }
                    retries += 1;
                    warn!(kind = kind.as_str(), slug = %new.slug, retries, "slug taken concurrently");
                    new.slug = slug::allocate(self.pool(), kind, slug_source, fallback, None).await?;
                }
                result => return result,
            }
        }
    }

    /// Save `item`, re-allocating a newly chosen slug when a concurrent save
    /// took it. `slug_source` is None when the slug was left unchanged.
    async fn persist(
        &self,
        mut item: ContentItem,
        slug_source: Option<&str>,
        fallback: &str,
    ) -> Result<Option<ContentItem>> {
        let mut retries = 0;
        loop {
            match item.save(self.pool()).await {
                Err(e) if slug::is_conflict(&e) => {
                    let Some(source) = slug_source else {
                        return Err(e);
                    };
                    if retries == slug::CONFLICT_RETRIES {
                        return Err(slug::SlugTaken(item.slug).into());
                    }
                    retries += 1;
                    warn!(kind = item.kind.as_str(), slug = %item.slug, retries, "slug taken concurrently");
                    item.slug =
                        slug::allocate(self.pool(), item.kind, source, fallback, Some(item.id)).await?;
                }
                result => return result,
            }
        }
    }
}

/// Copy the text fields present in `input` onto `item`.
fn apply_fields(item: &mut ContentItem, input: &ContentInput) {
    if let Some(title) = &input.title {
        item.title = title.trim().to_string();
    }
    if let Some(body) = &input.body {
        item.body = body.clone();
    }
    if input.excerpt.is_some() {
        item.excerpt = non_empty(input.excerpt.clone());
    }
    if input.seo_description.is_some() {
        item.seo_description = non_empty(input.seo_description.clone());
    }
    if input.seo_keywords.is_some() {
        item.seo_keywords = non_empty(input.seo_keywords.clone());
    }
}

/// Move `item` to draft from any state; a trashed item also loses its trash
/// metadata.
fn force_draft(item: &mut ContentItem, now: DateTime<Utc>) {
    match item.state {
        ContentState::Published => {
            item.apply(Transition::Draft, None, now);
        }
        ContentState::Trashed => {
            item.apply(Transition::Restore, None, now);
        }
        ContentState::Draft => {}
    }
}

fn requested_slug(input: &ContentInput) -> Option<&str> {
    input
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(state: ContentState) -> ContentItem {
        let now = Utc::now();
        let trashed = state == ContentState::Trashed;
        ContentItem {
            id: Uuid::now_v7(),
            kind: ContentKind::Post,
            title: "Title".to_string(),
            slug: "title".to_string(),
            body: String::new(),
            excerpt: None,
            state,
            published_at: (state == ContentState::Published).then_some(now),
            trashed_at: trashed.then_some(now),
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
    fn autosave_forces_draft_from_every_state() {
        for state in [ContentState::Draft, ContentState::Published, ContentState::Trashed] {
            let mut post = item(state);
            force_draft(&mut post, Utc::now());
            assert_eq!(post.state, ContentState::Draft);
            assert!(post.trashed_at.is_none());
        }
    }

    #[test]
    fn apply_fields_skips_absent_fields() {
        let mut post = item(ContentState::Draft);
        post.excerpt = Some("keep".to_string());
        apply_fields(
            &mut post,
            &ContentInput {
                title: Some("  New title ".to_string()),
                seo_keywords: Some("  ".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(post.title, "New title");
        assert_eq!(post.excerpt.as_deref(), Some("keep"));
        assert_eq!(post.seo_keywords, None);
    }

    #[test]
    fn blank_slug_is_not_requested() {
        let input = ContentInput {
            slug: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(requested_slug(&input), None);

        let input = ContentInput {
            slug: Some(" My Slug ".to_string()),
            ..Default::default()
        };
        assert_eq!(requested_slug(&input), Some("My Slug"));
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
