//! Authentication routes (login, logout, current user).

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::routes::helpers::require_user;
use crate::state::AppState;

/// Session key for storing the authenticated user ID.
pub const SESSION_USER_ID: &str = "user_id";

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

/// Public view of the logged-in user.
#[derive(Debug, Serialize)]
pub struct Me {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

impl From<&User> for Me {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name(),
            role: user.role().as_str().to_string(),
        }
    }
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = User::find_by_username(state.db(), request.username.trim()).await?;

    // Unknown user, inactive account and wrong password look the same.
    let Some(user) = user.filter(|u| u.is_active && u.verify_password(&request.password)) else {
        warn!(username = %request.username, "failed login attempt");
        return Err(AppError::Unauthorized);
    };

    if let Err(e) = User::touch_login(state.db(), user.id).await {
        warn!(error = %e, user_id = %user.id, "failed to update login timestamp");
    }

    // Rotate the session id on privilege change.
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to cycle session: {e}")))?;
    session
        .insert(SESSION_USER_ID, user.id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to store session: {e}")))?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
    }))
}

/// POST /api/auth/logout
async fn logout(session: Session) -> AppResult<Json<LoginResponse>> {
    let user_id: Option<Uuid> = session.get(SESSION_USER_ID).await.ok().flatten();

    session
        .delete()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to delete session: {e}")))?;

    if let Some(id) = user_id {
        info!(user_id = %id, "user logged out");
    }

    Ok(Json(LoginResponse {
        success: true,
        message: "Logout successful".to_string(),
    }))
}

/// GET /api/auth/me
async fn me(State(state): State<AppState>, session: Session) -> AppResult<Json<Me>> {
    let user = require_user(&state, &session).await?;
    Ok(Json(Me::from(&user)))
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}
