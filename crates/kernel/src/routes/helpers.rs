//! Shared route helpers: session user lookup, role checks, pagination.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::routes::auth::SESSION_USER_ID;
use crate::state::AppState;

/// The logged-in user, if any.
pub async fn current_user(state: &AppState, session: &Session) -> AppResult<Option<User>> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();
    let Some(id) = user_id else {
        return Ok(None);
    };

    let user = User::find_by_id(state.db(), id).await?;
    Ok(user.filter(|u| u.is_active))
}

/// Require an authenticated user.
pub async fn require_user(state: &AppState, session: &Session) -> AppResult<User> {
    current_user(state, session)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Require an authenticated administrator.
///
/// Returns 401 without a session and 403 for non-admin users.
pub async fn require_admin(state: &AppState, session: &Session) -> AppResult<User> {
    let user = require_user(state, session).await?;
    if user.is_admin() {
        Ok(user)
    } else {
        Err(AppError::Forbidden)
    }
}

/// `?page=` query parameter, 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    /// Clamp a requested page to 1 or above.
    pub fn new(page: Option<i64>, per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page,
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 {
            1
        } else {
            (total + self.per_page - 1) / self.per_page
        }
    }

    /// Wrap one page of results.
    pub fn wrap<T: Serialize>(&self, items: Vec<T>, total: i64) -> Paged<T> {
        let total_pages = self.total_pages(total);
        Paged {
            items,
            page: self.page,
            per_page: self.per_page,
            total,
            total_pages,
            has_next: self.page < total_pages,
            has_previous: self.page > 1,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct Paged<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// `{affected}` body returned by state-changing admin actions.
#[derive(Debug, Serialize)]
pub struct Affected {
    pub affected: u64,
}

/// Bulk request body shared by the admin listings.
#[derive(Debug, Deserialize)]
pub struct BulkRequest<A> {
    pub action: A,
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

/// Treat an empty query string value as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
