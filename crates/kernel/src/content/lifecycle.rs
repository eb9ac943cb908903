//! Content lifecycle transitions: trash, restore, publish, unpublish.
//!
//! Eligibility lives in [`Transition::eligible_from`]. Single-item and bulk
//! paths both derive from it, so an item in an ineligible state is left
//! untouched and is not counted as affected.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ContentItem, ContentKind, ContentState};

/// A state change applied to one or more content items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Soft-delete, recording who and when.
    Trash,
    /// Bring back from the trash as a draft.
    Restore,
    Publish,
    /// Unpublish back to draft.
    Draft,
}

impl Transition {
    /// States an item must be in for this transition to apply.
    pub fn eligible_from(self) -> &'static [ContentState] {
        match self {
            Transition::Trash => &[ContentState::Draft, ContentState::Published],
            Transition::Restore => &[ContentState::Trashed],
            Transition::Publish => &[ContentState::Draft],
            Transition::Draft => &[ContentState::Published],
        }
    }

    pub fn target(self) -> ContentState {
        match self {
            Transition::Trash => ContentState::Trashed,
            Transition::Restore | Transition::Draft => ContentState::Draft,
            Transition::Publish => ContentState::Published,
        }
    }

    pub fn applies_to(self, state: ContentState) -> bool {
        self.eligible_from().contains(&state)
    }

    fn eligible_names(self) -> Vec<String> {
        self.eligible_from()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }
}

/// Bulk action requested from the dashboard list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Trash,
    Restore,
    /// Permanent delete; applies regardless of state.
    Delete,
    Publish,
    Draft,
}

impl BulkAction {
    /// The lifecycle transition, or None for permanent delete.
    pub fn transition(self) -> Option<Transition> {
        match self {
            BulkAction::Trash => Some(Transition::Trash),
            BulkAction::Restore => Some(Transition::Restore),
            BulkAction::Publish => Some(Transition::Publish),
            BulkAction::Draft => Some(Transition::Draft),
            BulkAction::Delete => None,
        }
    }

    /// Past-tense verb for user-facing messages.
    pub fn past_tense(self) -> &'static str {
        match self {
            BulkAction::Trash => "moved to trash",
            BulkAction::Restore => "restored",
            BulkAction::Delete => "permanently deleted",
            BulkAction::Publish => "published",
            BulkAction::Draft => "moved to draft",
        }
    }
}

impl ContentItem {
    /// Apply a transition in memory.
    ///
    /// Returns false and leaves the item untouched when the current state is
    /// not eligible.
    pub fn apply(&mut self, transition: Transition, actor: Option<Uuid>, now: DateTime<Utc>) -> bool {
        if !transition.applies_to(self.state) {
            return false;
        }

        match transition {
            Transition::Trash => {
                self.trashed_at = Some(now);
                self.trashed_by = actor;
            }
            Transition::Restore => {
                self.trashed_at = None;
                self.trashed_by = None;
            }
            Transition::Publish => {
                self.published_at.get_or_insert(now);
            }
            Transition::Draft => {}
        }

        self.state = transition.target();
        self.updated_at = now;
        true
    }
}

/// Apply a transition to every eligible item in `ids`.
///
/// Items in other states and unknown ids are skipped. Returns the number of
/// items changed.
pub async fn apply_bulk(
    pool: &PgPool,
    kind: ContentKind,
    transition: Transition,
    ids: &[Uuid],
    actor: Option<Uuid>,
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let table = kind.table();
    let now = Utc::now();
    let eligible = transition.eligible_names();

    let result = match transition {
        Transition::Trash => {
            let sql = format!(
                "UPDATE {table} SET state = 'trashed', trashed_at = $3, trashed_by = $4, updated_at = $3 \
                 WHERE id = ANY($1) AND state = ANY($2)"
            );
            sqlx::query(&sql)
                .bind(ids)
                .bind(&eligible)
                .bind(now)
                .bind(actor)
                .execute(pool)
                .await
        }
        Transition::Restore => {
            let sql = format!(
                "UPDATE {table} SET state = 'draft', trashed_at = NULL, trashed_by = NULL, updated_at = $3 \
                 WHERE id = ANY($1) AND state = ANY($2)"
            );
            sqlx::query(&sql)
                .bind(ids)
                .bind(&eligible)
                .bind(now)
                .execute(pool)
                .await
        }
        Transition::Publish => {
            let sql = format!(
                "UPDATE {table} SET state = 'published', published_at = COALESCE(published_at, $3), \
                 updated_at = $3 WHERE id = ANY($1) AND state = ANY($2)"
            );
            sqlx::query(&sql)
                .bind(ids)
                .bind(&eligible)
                .bind(now)
                .execute(pool)
                .await
        }
        Transition::Draft => {
            let sql = format!(
                "UPDATE {table} SET state = 'draft', updated_at = $3 \
                 WHERE id = ANY($1) AND state = ANY($2)"
            );
            sqlx::query(&sql)
                .bind(ids)
                .bind(&eligible)
                .bind(now)
                .execute(pool)
                .await
        }
    }
    .context("failed to apply content transition")?;

    let affected = result.rows_affected();
    tracing::info!(
        kind = kind.as_str(),
        transition = ?transition,
        requested = ids.len(),
        affected,
        "content transition applied"
    );
    Ok(affected)
}

/// Permanently delete items regardless of state. Returns rows removed.
pub async fn delete_permanently(pool: &PgPool, kind: ContentKind, ids: &[Uuid]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let sql = format!("DELETE FROM {} WHERE id = ANY($1)", kind.table());
    let result = sqlx::query(&sql)
        .bind(ids)
        .execute(pool)
        .await
        .context("failed to delete content")?;

    tracing::info!(
        kind = kind.as_str(),
        deleted = result.rows_affected(),
        "content permanently deleted"
    );
    Ok(result.rows_affected())
}

/// Run a bulk action. Returns the number of items affected.
pub async fn run_bulk_action(
    pool: &PgPool,
    kind: ContentKind,
    action: BulkAction,
    ids: &[Uuid],
    actor: Option<Uuid>,
) -> Result<u64> {
    match action.transition() {
        Some(transition) => apply_bulk(pool, kind, transition, ids, actor).await,
        None => delete_permanently(pool, kind, ids).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(state: ContentState) -> ContentItem {
        let created = Utc::now() - Duration::days(1);
        ContentItem {
            id: Uuid::now_v7(),
            kind: ContentKind::Post,
            title: "T".to_string(),
            slug: "t".to_string(),
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
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn trash_records_actor_and_time() {
        let actor = Uuid::now_v7();
        let now = Utc::now();
        let mut post = item(ContentState::Published);

        assert!(post.apply(Transition::Trash, Some(actor), now));
        assert_eq!(post.state, ContentState::Trashed);
        assert_eq!(post.trashed_at, Some(now));
        assert_eq!(post.trashed_by, Some(actor));
    }

    #[test]
    fn restore_clears_trash_metadata_and_lands_in_draft() {
        let now = Utc::now();
        let mut post = item(ContentState::Published);
        post.apply(Transition::Trash, Some(Uuid::now_v7()), now);

        assert!(post.apply(Transition::Restore, None, now));
        assert_eq!(post.state, ContentState::Draft);
        assert!(post.trashed_at.is_none());
        assert!(post.trashed_by.is_none());
    }

    #[test]
    fn restore_of_live_item_is_noop() {
        let mut post = item(ContentState::Draft);
        let before = post.updated_at;
        assert!(!post.apply(Transition::Restore, None, Utc::now()));
        assert_eq!(post.state, ContentState::Draft);
        assert_eq!(post.updated_at, before);
    }

    #[test]
    fn trash_of_trashed_item_is_noop() {
        let first = Utc::now() - Duration::hours(2);
        let mut post = item(ContentState::Draft);
        post.apply(Transition::Trash, None, first);

        assert!(!post.apply(Transition::Trash, Some(Uuid::now_v7()), Utc::now()));
        assert_eq!(post.trashed_at, Some(first));
        assert!(post.trashed_by.is_none());
    }

    #[test]
    fn publish_stamps_first_publication_only() {
        let first = Utc::now() - Duration::days(3);
        let mut post = item(ContentState::Draft);
        assert!(post.apply(Transition::Publish, None, first));
        assert_eq!(post.published_at, Some(first));

        assert!(post.apply(Transition::Draft, None, Utc::now()));
        assert!(post.apply(Transition::Publish, None, Utc::now()));
        assert_eq!(post.published_at, Some(first));
    }

    #[test]
    fn trashed_items_cannot_be_published_or_unpublished() {
        let mut post = item(ContentState::Trashed);
        assert!(!post.apply(Transition::Publish, None, Utc::now()));
        assert!(!post.apply(Transition::Draft, None, Utc::now()));
        assert_eq!(post.state, ContentState::Trashed);
    }

    #[test]
    fn bulk_restore_counts_only_trashed() {
        let now = Utc::now();
        let mut items = vec![
            item(ContentState::Trashed),
            item(ContentState::Trashed),
            item(ContentState::Draft),
            item(ContentState::Published),
        ];

        let mut affected = 0;
        for post in &mut items {
            if post.apply(Transition::Restore, None, now) {
                affected += 1;
            }
        }

        assert_eq!(affected, 2);
        assert!(items.iter().all(|i| i.state != ContentState::Trashed));
    }

    #[test]
    fn bulk_action_mapping() {
        assert_eq!(BulkAction::Trash.transition(), Some(Transition::Trash));
        assert_eq!(BulkAction::Delete.transition(), None);
        let action: BulkAction = serde_json::from_str("\"restore\"").unwrap();
        assert_eq!(action, BulkAction::Restore);
        assert!(serde_json::from_str::<BulkAction>("\"explode\"").is_err());
    }

    #[test]
    fn eligibility_table() {
        assert!(Transition::Trash.applies_to(ContentState::Draft));
        assert!(Transition::Trash.applies_to(ContentState::Published));
        assert!(!Transition::Trash.applies_to(ContentState::Trashed));
        assert_eq!(
            Transition::Restore.eligible_names(),
            vec!["trashed".to_string()]
        );
    }
}
