//! Comments on blog posts, with one level of replies and an approval gate.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Number of top-level comments shown before "show all".
pub const DEFAULT_VISIBLE_COMMENTS: i64 = 10;

/// Comment record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,

    /// Parent comment ID (NULL for top-level comments).
    pub parent_id: Option<Uuid>,

    pub name: String,
    #[serde(skip_serializing)]
    pub email: String,
    pub website: Option<String>,
    pub body: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// A top-level comment with its approved replies.
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Comment row for the moderation queue, joined with its post.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ModerationComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub post_title: String,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub website: Option<String>,
    pub body: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub website: Option<String>,
    pub body: String,
    #[serde(default)]
    pub approved: bool,
}

/// Moderation queue filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationFilter {
    #[default]
    All,
    /// Comments on posts written by the current user.
    Mine,
    Pending,
    Approved,
}

/// Counts shown on the moderation tabs.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct ModerationCounts {
    pub all: i64,
    pub mine: i64,
    pub pending: i64,
    pub approved: i64,
}

/// Bulk moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentBulkAction {
    Approve,
    Unapprove,
    Delete,
}

const COLUMNS: &str = "id, post_id, parent_id, name, email, website, body, approved, created_at";

/// Group approved replies under their approved top-level parents.
///
/// Unapproved comments are dropped at both levels. Replies whose parent is
/// not among `top_level` are ignored. Replies are ordered oldest first; the
/// order of `top_level` is kept.
pub fn build_threads(top_level: Vec<Comment>, replies: Vec<Comment>) -> Vec<CommentThread> {
    let mut by_parent: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for reply in replies.into_iter().filter(|r| r.approved) {
        if let Some(parent) = reply.parent_id {
            by_parent.entry(parent).or_default().push(reply);
        }
    }

    top_level
        .into_iter()
        .filter(|c| c.approved && c.parent_id.is_none())
        .map(|comment| {
            let mut replies = by_parent.remove(&comment.id).unwrap_or_default();
            replies.sort_by_key(|r| r.created_at);
            CommentThread { comment, replies }
        })
        .collect()
}

impl Comment {
    pub async fn create(pool: &PgPool, input: CreateComment) -> Result<Self> {
        let sql = format!(
            r#"
            INSERT INTO comments (id, post_id, parent_id, name, email, website, body, approved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::now_v7())
            .bind(input.post_id)
            .bind(input.parent_id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.website)
            .bind(&input.body)
            .bind(input.approved)
            .fetch_one(pool)
            .await
            .context("failed to create comment")?;

        Ok(comment)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch comment")?;

        Ok(comment)
    }

    /// Public thread for a post: approved top-level comments, newest first,
    /// each with approved replies.
    pub async fn public_threads(
        pool: &PgPool,
        post_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<CommentThread>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM comments \
             WHERE post_id = $1 AND parent_id IS NULL AND approved \
             ORDER BY created_at DESC LIMIT $2"
        );
        let top_level = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(limit)
            .fetch_all(pool)
            .await
            .context("failed to list comments")?;

        if top_level.is_empty() {
            return Ok(Vec::new());
        }

        let parent_ids: Vec<Uuid> = top_level.iter().map(|c| c.id).collect();
        let sql = format!(
            "SELECT {COLUMNS} FROM comments WHERE parent_id = ANY($1) AND approved \
             ORDER BY created_at"
        );
        let replies = sqlx::query_as::<_, Comment>(&sql)
            .bind(&parent_ids)
            .fetch_all(pool)
            .await
            .context("failed to list comment replies")?;

        Ok(build_threads(top_level, replies))
    }

    /// Count approved top-level comments on a post.
    pub async fn count_public(pool: &PgPool, post_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE post_id = $1 AND parent_id IS NULL AND approved",
        )
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("failed to count comments")?;

        Ok(count)
    }

    /// Moderation queue, newest first.
    pub async fn list_for_moderation(
        pool: &PgPool,
        filter: ModerationFilter,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ModerationComment>> {
        let comments = sqlx::query_as::<_, ModerationComment>(
            r#"
            SELECT c.id, c.post_id, p.title AS post_title, c.parent_id, c.name, c.email,
                   c.website, c.body, c.approved, c.created_at
            FROM comments c
            JOIN posts p ON p.id = c.post_id
            WHERE ($1 <> 'mine' OR p.author_id = $2)
              AND ($1 <> 'pending' OR NOT c.approved)
              AND ($1 <> 'approved' OR c.approved)
            ORDER BY c.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.as_str())
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("failed to list comments for moderation")?;

        Ok(comments)
    }

    /// Tab counts for the moderation queue.
    pub async fn moderation_counts(pool: &PgPool, user_id: Uuid) -> Result<ModerationCounts> {
        let counts = sqlx::query_as::<_, ModerationCounts>(
            r#"
            SELECT
                COUNT(*) AS all,
                COUNT(*) FILTER (WHERE p.author_id = $1) AS mine,
                COUNT(*) FILTER (WHERE NOT c.approved) AS pending,
                COUNT(*) FILTER (WHERE c.approved) AS approved
            FROM comments c
            JOIN posts p ON p.id = c.post_id
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .context("failed to count comments")?;

        Ok(counts)
    }

    pub async fn set_approved(pool: &PgPool, ids: &[Uuid], approved: bool) -> Result<u64> {
        let result = sqlx::query("UPDATE comments SET approved = $1 WHERE id = ANY($2)")
            .bind(approved)
            .bind(ids)
            .execute(pool)
            .await
            .context("failed to update comment approval")?;

        Ok(result.rows_affected())
    }

    pub async fn update_body(pool: &PgPool, id: Uuid, body: &str) -> Result<Option<Self>> {
        let sql = format!("UPDATE comments SET body = $1 WHERE id = $2 RETURNING {COLUMNS}");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(body)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to update comment")?;

        Ok(comment)
    }

    pub async fn delete_many(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await
            .context("failed to delete comments")?;

        Ok(result.rows_affected())
    }

    /// Approved / pending totals for the dashboard.
    pub async fn approval_totals(pool: &PgPool) -> Result<(i64, i64)> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*) FILTER (WHERE approved), COUNT(*) FILTER (WHERE NOT approved) \
             FROM comments",
        )
        .fetch_one(pool)
        .await
        .context("failed to count comment totals")?;

        Ok(row)
    }
}

impl ModerationFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationFilter::All => "all",
            ModerationFilter::Mine => "mine",
            ModerationFilter::Pending => "pending",
            ModerationFilter::Approved => "approved",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn comment(parent: Option<Uuid>, approved: bool, minutes_ago: i64) -> Comment {
        Comment {
            id: Uuid::now_v7(),
            post_id: Uuid::nil(),
            parent_id: parent,
            name: "Reader".to_string(),
            email: "reader@example.com".to_string(),
            website: None,
            body: "Nice".to_string(),
            approved,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn unapproved_top_level_hidden() {
        let pending = comment(None, false, 5);
        let threads = build_threads(vec![pending.clone()], vec![]);
        assert!(threads.is_empty());

        let mut approved = pending;
        approved.approved = true;
        let threads = build_threads(vec![approved.clone()], vec![]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.id, approved.id);
    }

    #[test]
    fn replies_attached_oldest_first_and_filtered() {
        let parent = comment(None, true, 60);
        let newer = comment(Some(parent.id), true, 5);
        let older = comment(Some(parent.id), true, 30);
        let hidden = comment(Some(parent.id), false, 10);
        let stray = comment(Some(Uuid::now_v7()), true, 1);

        let threads = build_threads(
            vec![parent.clone()],
            vec![newer.clone(), hidden, older.clone(), stray],
        );

        assert_eq!(threads.len(), 1);
        let ids: Vec<Uuid> = threads[0].replies.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[test]
    fn replies_are_not_top_level() {
        let parent = comment(None, true, 10);
        let reply = comment(Some(parent.id), true, 5);
        let threads = build_threads(vec![parent, reply], vec![]);
        assert_eq!(threads.len(), 1);
    }

    #[test]
    fn top_level_order_preserved() {
        let a = comment(None, true, 1);
        let b = comment(None, true, 20);
        let threads = build_threads(vec![a.clone(), b.clone()], vec![]);
        assert_eq!(threads[0].comment.id, a.id);
        assert_eq!(threads[1].comment.id, b.id);
    }

    #[test]
    fn email_not_serialized_publicly() {
        let json = serde_json::to_value(comment(None, true, 0)).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["name"], "Reader");
    }
}
