//! Session management using Redis.

use anyhow::{Context, Result};
use fred::prelude::*;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_redis_store::RedisStore;

/// Session expiry after inactivity (24 hours).
pub const SESSION_EXPIRY_HOURS: i64 = 24;

/// Parse the `COOKIE_SAME_SITE` setting. Unknown values fall back to strict.
pub fn parse_same_site(value: &str) -> SameSite {
    match value.to_ascii_lowercase().as_str() {
        "lax" => SameSite::Lax,
        "none" => SameSite::None,
        _ => SameSite::Strict,
    }
}

/// Create the session layer using Redis as the backend.
pub async fn create_session_layer(
    redis_url: &str,
    same_site: SameSite,
) -> Result<SessionManagerLayer<RedisStore<Pool>>> {
    let config = Config::from_url(redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    let layer = SessionManagerLayer::new(RedisStore::new(pool))
        .with_secure(true)
        .with_http_only(true)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::hours(SESSION_EXPIRY_HOURS)));

    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_site_values() {
        assert_eq!(parse_same_site("lax"), SameSite::Lax);
        assert_eq!(parse_same_site("None"), SameSite::None);
        assert_eq!(parse_same_site("strict"), SameSite::Strict);
        assert_eq!(parse_same_site("bogus"), SameSite::Strict);
    }
}
