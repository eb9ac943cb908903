//! Dashboard overview.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_sessions::Session;

use crate::error::AppResult;
use crate::models::{Comment, ContentItem, ContentKind, Project};
use crate::routes::helpers::require_user;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct DashboardCounts {
    posts_count: i64,
    pages_count: i64,
    comments_count: i64,
    pending_comments_count: i64,
    projects_count: i64,
}

/// GET /api/admin/dashboard
async fn overview(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<DashboardCounts>> {
    require_user(&state, &session).await?;

    let (posts_count, pages_count, (comments_count, pending_comments_count), projects_count) = tokio::try_join!(
        ContentItem::count_published(state.db(), ContentKind::Post),
        ContentItem::count_published(state.db(), ContentKind::Page),
        Comment::approval_totals(state.db()),
        Project::count(state.db()),
    )?;

    Ok(Json(DashboardCounts {
        posts_count,
        pages_count,
        comments_count,
        pending_comments_count,
        projects_count,
    }))
}

/// Create the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/dashboard", get(overview))
}
