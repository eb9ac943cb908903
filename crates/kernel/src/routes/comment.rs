//! Comment routes: public thread and submission, admin moderation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::mail::contact::comment_notification;
use crate::models::comment::{
    CommentBulkAction, DEFAULT_VISIBLE_COMMENTS, ModerationComment, ModerationCounts,
    ModerationFilter,
};
use crate::models::{Comment, CommentThread, ContentItem, ContentKind, CreateComment};
use crate::routes::helpers::{Affected, BulkRequest, Paged, Pagination, require_admin};
use crate::state::AppState;

const MODERATION_PAGE_SIZE: i64 = 10;

/// Create the comment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/posts/{slug}/comments",
            get(public_comments).post(submit_comment),
        )
        .route("/api/admin/comments", get(moderation_queue))
        .route("/api/admin/comments/bulk", post(bulk))
        .route(
            "/api/admin/comments/{id}",
            axum::routing::put(edit).delete(destroy),
        )
        .route("/api/admin/comments/{id}/approve", post(approve))
        .route("/api/admin/comments/{id}/unapprove", post(unapprove))
        .route("/api/admin/comments/{id}/reply", post(reply))
}

async fn published_post(state: &AppState, slug: &str) -> AppResult<ContentItem> {
    ContentItem::find_published_by_slug(state.db(), ContentKind::Post, slug)
        .await?
        .ok_or(AppError::NotFound)
}

#[derive(Debug, Default, Deserialize)]
struct ThreadQuery {
    #[serde(default)]
    show_all: bool,
}

#[derive(Debug, Serialize)]
struct ThreadResponse {
    comments: Vec<CommentThread>,
    total: i64,
    show_all: bool,
}

/// GET /api/posts/{slug}/comments
///
/// Approved top-level comments with approved replies. Only the newest ten
/// unless `show_all` is set; `total` counts all of them.
async fn public_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ThreadQuery>,
) -> AppResult<Json<ThreadResponse>> {
    let post = published_post(&state, &slug).await?;
    let limit = (!query.show_all).then_some(DEFAULT_VISIBLE_COMMENTS);

    let (comments, total) = tokio::try_join!(
        Comment::public_threads(state.db(), post.id, limit),
        Comment::count_public(state.db(), post.id),
    )?;

    Ok(Json(ThreadResponse {
        comments,
        total,
        show_all: query.show_all,
    }))
}

/// Public comment form.
#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub website: Option<String>,
    #[serde(default)]
    pub body: String,
    pub parent_id: Option<Uuid>,
}

impl CommentForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, value) in [("name", &self.name), ("email", &self.email), ("body", &self.body)] {
            if value.trim().is_empty() {
                errors.insert(
                    field.to_string(),
                    vec!["This field is required.".to_string()],
                );
            }
        }
        if !errors.contains_key("email") && self.email.trim().parse::<lettre::Address>().is_err() {
            errors.insert(
                "email".to_string(),
                vec!["Enter a valid email address.".to_string()],
            );
        }
        errors
    }
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    success: bool,
    message: &'static str,
}

/// POST /api/posts/{slug}/comments
///
/// New comments wait for approval. The site owner is notified; mail
/// problems never fail the submission.
async fn submit_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(form): Json<CommentForm>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let post = published_post(&state, &slug).await?;

    let errors = form.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(parent_id) = form.parent_id {
        let parent = Comment::find_by_id(state.db(), parent_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if parent.post_id != post.id {
            return Err(AppError::field(
                "parent_id",
                "Reply must belong to the same post.",
            ));
        }
    }

    let comment = Comment::create(
        state.db(),
        CreateComment {
            post_id: post.id,
            parent_id: form.parent_id,
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            website: form
                .website
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty()),
            body: form.body.trim().to_string(),
            approved: false,
        },
    )
    .await?;

    info!(comment_id = %comment.id, post_id = %post.id, "comment submitted");

    if let Some(mailer) = state.mailer() {
        let notice = comment_notification(
            &state.config().contact_email,
            &post.title,
            &comment.name,
            &comment.body,
        );
        // fail_silently: errors are logged inside the mailer
        let _ = mailer.send(notice, true).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            message: "Your comment is awaiting approval.",
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
struct ModerationQuery {
    #[serde(default)]
    filter: ModerationFilter,
    page: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ModerationResponse {
    filter: ModerationFilter,
    counts: ModerationCounts,
    comments: Paged<ModerationComment>,
}

/// GET /api/admin/comments?filter=all|mine|pending|approved
async fn moderation_queue(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ModerationQuery>,
) -> AppResult<Json<ModerationResponse>> {
    let user = require_admin(&state, &session).await?;
    let pagination = Pagination::new(query.page, MODERATION_PAGE_SIZE);

    let (comments, counts) = tokio::try_join!(
        Comment::list_for_moderation(
            state.db(),
            query.filter,
            user.id,
            pagination.limit(),
            pagination.offset()
        ),
        Comment::moderation_counts(state.db(), user.id),
    )?;

    let total = match query.filter {
        ModerationFilter::All => counts.all,
        ModerationFilter::Mine => counts.mine,
        ModerationFilter::Pending => counts.pending,
        ModerationFilter::Approved => counts.approved,
    };

    Ok(Json(ModerationResponse {
        filter: query.filter,
        comments: pagination.wrap(comments, total),
        counts,
    }))
}

async fn set_approval(state: &AppState, id: Uuid, approved: bool) -> AppResult<Json<Affected>> {
    let affected = Comment::set_approved(state.db(), &[id], approved).await?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    info!(comment_id = %id, approved, "comment moderated");
    Ok(Json(Affected { affected }))
}

/// POST /api/admin/comments/{id}/approve
async fn approve(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Affected>> {
    require_admin(&state, &session).await?;
    set_approval(&state, id, true).await
}

/// POST /api/admin/comments/{id}/unapprove
async fn unapprove(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Affected>> {
    require_admin(&state, &session).await?;
    set_approval(&state, id, false).await
}

#[derive(Debug, Deserialize)]
struct BodyRequest {
    #[serde(default)]
    body: String,
}

impl BodyRequest {
    fn trimmed(&self) -> AppResult<&str> {
        let body = self.body.trim();
        if body.is_empty() {
            return Err(AppError::field("body", "This field is required."));
        }
        Ok(body)
    }
}

/// POST /api/admin/comments/{id}/reply
///
/// The reply is approved immediately and signed by the acting user.
async fn reply(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(request): Json<BodyRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let user = require_admin(&state, &session).await?;
    let body = request.trimmed()?;

    let parent = Comment::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let comment = Comment::create(
        state.db(),
        CreateComment {
            post_id: parent.post_id,
            parent_id: Some(parent.id),
            name: user.display_name(),
            email: user.email.clone(),
            website: None,
            body: body.to_string(),
            approved: true,
        },
    )
    .await?;

    info!(comment_id = %comment.id, parent_id = %parent.id, user_id = %user.id, "admin replied to comment");
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/admin/comments/{id}
async fn edit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(request): Json<BodyRequest>,
) -> AppResult<Json<Comment>> {
    require_admin(&state, &session).await?;
    let body = request.trimmed()?;

    let comment = Comment::update_body(state.db(), id, body)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(comment))
}

/// DELETE /api/admin/comments/{id}
///
/// Replies are removed with their parent.
async fn destroy(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Affected>> {
    require_admin(&state, &session).await?;

    let affected = Comment::delete_many(state.db(), &[id]).await?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(Json(Affected { affected }))
}

/// POST /api/admin/comments/bulk
async fn bulk(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<BulkRequest<CommentBulkAction>>,
) -> AppResult<Json<Affected>> {
    require_admin(&state, &session).await?;
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("no comments selected".to_string()));
    }

    let affected = match request.action {
        CommentBulkAction::Approve => Comment::set_approved(state.db(), &request.ids, true).await?,
        CommentBulkAction::Unapprove => {
            Comment::set_approved(state.db(), &request.ids, false).await?
        }
        CommentBulkAction::Delete => Comment::delete_many(state.db(), &request.ids).await?,
    };

    info!(action = ?request.action, requested = request.ids.len(), affected, "comment bulk action");
    Ok(Json(Affected { affected }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn comment_form_requires_fields() {
        let errors = CommentForm::default().validate();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("email"));
        assert!(errors.contains_key("body"));
    }

    #[test]
    fn comment_form_checks_email() {
        let form = CommentForm {
            name: "Bob".to_string(),
            email: "bob@".to_string(),
            body: "Nice".to_string(),
            ..Default::default()
        };
        assert_eq!(form.validate().len(), 1);

        let ok = CommentForm {
            email: "bob@example.com".to_string(),
            ..form
        };
        assert!(ok.validate().is_empty());
    }

    #[test]
    fn moderation_filter_defaults_to_all() {
        let query: ModerationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.filter, ModerationFilter::All);
    }
}
