//! Health check endpoint.
//!
//! Returns 200 OK if both PostgreSQL and Redis are reachable,
//! 503 Service Unavailable otherwise. Mail is reported but never fails the
//! check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    postgres: bool,
    redis: bool,
    mail_configured: bool,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (postgres, redis) = tokio::join!(state.postgres_healthy(), state.redis_healthy());
    let healthy = postgres && redis;

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            postgres,
            redis,
            mail_configured: state.mailer().is_some(),
        }),
    )
}

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
