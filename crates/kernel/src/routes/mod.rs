//! HTTP route handlers.

pub mod admin_content;
pub mod auth;
pub mod blog;
pub mod category;
pub mod comment;
pub mod dashboard;
pub mod health;
pub mod helpers;
pub mod media;
pub mod portfolio;

use axum::Router;

use crate::state::AppState;

/// All routers merged.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(admin_content::router())
        .merge(category::router())
        .merge(comment::router())
        .merge(media::router())
        .merge(blog::router())
        .merge(portfolio::router())
}
