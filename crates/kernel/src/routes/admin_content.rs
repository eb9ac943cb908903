//! Dashboard routes for posts and pages.
//!
//! The same handlers serve both kinds; each nested router carries its
//! [`ContentKind`] as a request extension. Pages are administrator-only.
//! Any author may work with posts, but only on their own unless they are an
//! administrator.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::content::{BulkAction, SaveAction, Transition, lifecycle, slug};
use crate::error::{AppError, AppResult};
use crate::models::content::{AdminFilter, TabCounts, parse_month};
use crate::models::{ContentInput, ContentItem, ContentKind, ContentState, User};
use crate::routes::blog::{ItemView, item_view};
use crate::routes::helpers::{
    Affected, BulkRequest, Paged, Pagination, non_blank, require_admin, require_user,
};
use crate::state::AppState;

/// Dashboard page size.
const ADMIN_PAGE_SIZE: i64 = 20;

/// Create the admin content router for posts and pages.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/api/admin/posts",
            kind_router().layer(Extension(ContentKind::Post)),
        )
        .nest(
            "/api/admin/pages",
            kind_router().layer(Extension(ContentKind::Page)),
        )
}

fn kind_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/bulk", post(bulk))
        .route("/autosave", post(autosave))
        .route("/slug", get(slug_preview))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/preview", get(preview))
        .route("/{id}/featured-image", delete(remove_featured_image))
        .route("/{id}/{transition}", post(transition))
}

/// Resolve the acting user for a kind.
async fn require_editor(state: &AppState, session: &Session, kind: ContentKind) -> AppResult<User> {
    match kind {
        ContentKind::Page => require_admin(state, session).await,
        ContentKind::Post => require_user(state, session).await,
    }
}

/// Load an item the user may edit.
async fn load_editable(
    state: &AppState,
    user: &User,
    kind: ContentKind,
    id: Uuid,
) -> AppResult<ContentItem> {
    let item = ContentItem::find_by_id(state.db(), kind, id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !user.can_edit(item.author_id) {
        return Err(AppError::Forbidden);
    }
    Ok(item)
}

/// Restrict ids to those the user may act on.
async fn editable_ids(
    state: &AppState,
    user: &User,
    kind: ContentKind,
    ids: &[Uuid],
) -> AppResult<Vec<Uuid>> {
    if user.is_admin() {
        return Ok(ids.to_vec());
    }
    Ok(ContentItem::owned_ids(state.db(), kind, ids, user.id).await?)
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    /// One of all, mine, published, draft, trash.
    status: Option<String>,
    category: Option<Uuid>,
    /// `YYYY-MM`.
    month: Option<String>,
    search: Option<String>,
    page: Option<i64>,
}

/// Dashboard row.
#[derive(Debug, Serialize)]
struct AdminRow {
    #[serde(flatten)]
    item: ContentItem,
    days_in_trash: i64,
    can_auto_delete: bool,
    can_edit: bool,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    #[serde(flatten)]
    page: Paged<AdminRow>,
    counts: TabCounts,
    status: String,
}

fn admin_filter(query: &ListQuery, kind: ContentKind, user: &User) -> AppResult<AdminFilter> {
    let mut filter = AdminFilter::default();

    match query.status.as_deref().unwrap_or("all") {
        "all" => {}
        "mine" => filter.author_id = Some(user.id),
        "published" => filter.state = Some(ContentState::Published),
        "draft" => filter.state = Some(ContentState::Draft),
        "trash" => filter.trash = true,
        other => return Err(AppError::BadRequest(format!("unknown status: {other}"))),
    }

    if kind == ContentKind::Post {
        filter.category_id = query.category;
    }

    if let Some(month) = non_blank(query.month.clone()) {
        filter.month = Some(
            parse_month(&month)
                .ok_or_else(|| AppError::field("month", "Expected a month as YYYY-MM."))?,
        );
    }

    filter.search = non_blank(query.search.clone());
    Ok(filter)
}

/// GET /api/admin/{kind}
async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    let user = require_editor(&state, &session, kind).await?;
    let filter = admin_filter(&query, kind, &user)?;
    let pagination = Pagination::new(query.page, ADMIN_PAGE_SIZE);

    let (items, total, counts) = tokio::try_join!(
        ContentItem::list_admin(
            state.db(),
            kind,
            &filter,
            pagination.limit(),
            pagination.offset()
        ),
        ContentItem::count_admin(state.db(), kind, &filter),
        ContentItem::tab_counts(state.db(), kind, user.id),
    )?;

    let now = Utc::now();
    let rows = items
        .into_iter()
        .map(|item| AdminRow {
            days_in_trash: item.days_in_trash(now),
            can_auto_delete: item.can_auto_delete(now),
            can_edit: user.can_edit(item.author_id),
            item,
        })
        .collect();

    Ok(Json(ListResponse {
        page: pagination.wrap(rows, total),
        counts,
        status: query.status.unwrap_or_else(|| "all".to_string()),
    }))
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    #[serde(flatten)]
    input: ContentInput,
    /// Publish or keep as draft; updates leave the state alone when absent.
    action: Option<SaveAction>,
}

/// POST /api/admin/{kind}
async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Json(request): Json<SaveRequest>,
) -> AppResult<Json<ContentItem>> {
    let user = require_editor(&state, &session, kind).await?;

    let errors = request.input.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let item = state
        .content()
        .create(
            kind,
            request.input,
            request.action.unwrap_or(SaveAction::Draft),
            user.id,
        )
        .await?;

    Ok(Json(item))
}

/// GET /api/admin/{kind}/{id}
async fn show(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ItemView>> {
    let user = require_editor(&state, &session, kind).await?;
    let item = load_editable(&state, &user, kind, id).await?;
    Ok(Json(item_view(&state, item).await?))
}

/// PUT /api/admin/{kind}/{id}
async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(request): Json<SaveRequest>,
) -> AppResult<Json<ContentItem>> {
    let user = require_editor(&state, &session, kind).await?;
    let item = load_editable(&state, &user, kind, id).await?;

    // Title may be omitted on update; validate what will be saved.
    let mut check = request.input.clone();
    check.title.get_or_insert_with(|| item.title.clone());
    let errors = check.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let saved = state
        .content()
        .update(item, request.input, request.action)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(saved))
}

/// DELETE /api/admin/{kind}/{id}
///
/// Permanent delete in any state.
async fn destroy(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Affected>> {
    let user = require_editor(&state, &session, kind).await?;
    load_editable(&state, &user, kind, id).await?;

    let affected = lifecycle::delete_permanently(state.db(), kind, &[id]).await?;
    Ok(Json(Affected { affected }))
}

/// POST /api/admin/{kind}/{id}/{trash|restore|publish|draft}
///
/// An item in an ineligible state is left alone and reports 0 affected.
async fn transition(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Path((id, transition)): Path<(Uuid, Transition)>,
) -> AppResult<Json<Affected>> {
    let user = require_editor(&state, &session, kind).await?;
    load_editable(&state, &user, kind, id).await?;

    let affected =
        lifecycle::apply_bulk(state.db(), kind, transition, &[id], Some(user.id)).await?;
    Ok(Json(Affected { affected }))
}

#[derive(Debug, Serialize)]
struct BulkResponse {
    affected: u64,
    message: String,
}

/// POST /api/admin/{kind}/bulk
async fn bulk(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Json(request): Json<BulkRequest<BulkAction>>,
) -> AppResult<Json<BulkResponse>> {
    let user = require_editor(&state, &session, kind).await?;
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("no items selected".to_string()));
    }

    let ids = editable_ids(&state, &user, kind, &request.ids).await?;
    let affected =
        lifecycle::run_bulk_action(state.db(), kind, request.action, &ids, Some(user.id)).await?;

    Ok(Json(BulkResponse {
        affected,
        message: format!(
            "{affected} {}(s) {}.",
            kind.as_str(),
            request.action.past_tense()
        ),
    }))
}

#[derive(Debug, Deserialize)]
struct AutosaveRequest {
    id: Option<Uuid>,
    #[serde(flatten)]
    input: ContentInput,
}

#[derive(Debug, Serialize)]
struct AutosaveResponse {
    success: bool,
    id: Uuid,
    slug: String,
}

/// POST /api/admin/{kind}/autosave
///
/// Creates a draft when no id is given; an existing item is moved to draft.
async fn autosave(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Json(request): Json<AutosaveRequest>,
) -> AppResult<Json<AutosaveResponse>> {
    let user = require_editor(&state, &session, kind).await?;

    let errors = request.input.validate_seo();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(id) = request.id {
        load_editable(&state, &user, kind, id).await?;
    }

    let item = state
        .content()
        .autosave(kind, request.id, request.input, user.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(AutosaveResponse {
        success: true,
        id: item.id,
        slug: item.slug,
    }))
}

#[derive(Debug, Deserialize)]
struct SlugQuery {
    #[serde(default)]
    title: String,
    exclude: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct SlugResponse {
    slug: String,
}

/// GET /api/admin/{kind}/slug?title=&exclude=
async fn slug_preview(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Query(query): Query<SlugQuery>,
) -> AppResult<Json<SlugResponse>> {
    require_editor(&state, &session, kind).await?;

    let slug = slug::allocate(
        state.db(),
        kind,
        &query.title,
        kind.fallback_slug(),
        query.exclude,
    )
    .await?;

    Ok(Json(SlugResponse { slug }))
}

/// GET /api/admin/{kind}/{id}/preview
///
/// Renders the public view of an item in any state.
async fn preview(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ItemView>> {
    let user = require_editor(&state, &session, kind).await?;
    let item = load_editable(&state, &user, kind, id).await?;
    Ok(Json(item_view(&state, item).await?))
}

/// DELETE /api/admin/posts/{id}/featured-image
async fn remove_featured_image(
    State(state): State<AppState>,
    Extension(kind): Extension<ContentKind>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ContentItem>> {
    let user = require_editor(&state, &session, kind).await?;
    let mut item = load_editable(&state, &user, kind, id).await?;

    item.featured_image_id = None;
    let saved = item.save(state.db()).await?.ok_or(AppError::NotFound)?;
    Ok(Json(saved))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn user(role: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: "ann".to_string(),
            email: "ann@example.com".to_string(),
            pass: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role: role.to_string(),
            is_active: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn status_tabs_map_to_filters() {
        let author = user("author");
        let query = |status: &str| ListQuery {
            status: Some(status.to_string()),
            ..Default::default()
        };

        let mine = admin_filter(&query("mine"), ContentKind::Post, &author).unwrap();
        assert_eq!(mine.author_id, Some(author.id));

        let trash = admin_filter(&query("trash"), ContentKind::Post, &author).unwrap();
        assert!(trash.trash);

        let draft = admin_filter(&query("draft"), ContentKind::Post, &author).unwrap();
        assert_eq!(draft.state, Some(ContentState::Draft));
        assert!(!draft.trash);

        assert!(admin_filter(&query("bogus"), ContentKind::Post, &author).is_err());
    }

    #[test]
    fn category_filter_ignored_for_pages() {
        let admin = user("administrator");
        let query = ListQuery {
            category: Some(Uuid::now_v7()),
            ..Default::default()
        };
        assert!(admin_filter(&query, ContentKind::Page, &admin)
            .unwrap()
            .category_id
            .is_none());
        assert!(admin_filter(&query, ContentKind::Post, &admin)
            .unwrap()
            .category_id
            .is_some());
    }

    #[test]
    fn month_filter_parsed() {
        let admin = user("administrator");
        let query = ListQuery {
            month: Some("2025-03".to_string()),
            ..Default::default()
        };
        assert_eq!(
            admin_filter(&query, ContentKind::Post, &admin).unwrap().month,
            Some((2025, 3))
        );

        let bad = ListQuery {
            month: Some("March".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            admin_filter(&bad, ContentKind::Post, &admin),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn save_request_flattens_input() {
        let request: SaveRequest = serde_json::from_str(
            r#"{"title": "Hello", "seo_keywords": "a,b", "action": "publish"}"#,
        )
        .unwrap();
        assert_eq!(request.input.title.as_deref(), Some("Hello"));
        assert_eq!(request.action, Some(SaveAction::Publish));
    }
}
