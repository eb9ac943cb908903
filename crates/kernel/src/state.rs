//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::content::ContentService;
use crate::db;
use crate::file::{LocalFileStorage, MediaService};
use crate::mail::{GmailApiTransport, GmailCredentials, GoogleTokenEndpoint, Mailer, PgTokenStore};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Redis client used for health checks. Sessions have their own pool.
    redis: RedisClient,

    content: ContentService,

    media: MediaService,

    /// Outbound mail; None when Gmail is not configured.
    mailer: Option<Arc<Mailer>>,

    config: Config,
}

impl AppState {
    /// Connect to PostgreSQL and Redis, run migrations, and build services.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        let redis = RedisClient::open(config.redis_url.as_str())
            .context("failed to create Redis client")?;

        let mut conn = redis
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to Redis")?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;

        Ok(Self::from_parts(db, redis, config))
    }

    /// Build state from existing connections. No I/O is performed.
    pub fn from_parts(db: PgPool, redis: RedisClient, config: &Config) -> Self {
        let storage = Arc::new(LocalFileStorage::new(
            config.uploads_dir.clone(),
            config.files_url.clone(),
        ));
        let media = MediaService::new(db.clone(), storage);
        let content = ContentService::new(db.clone());

        let mailer = match &config.gmail {
            Some(gmail) => {
                let credentials = GmailCredentials::new(
                    Arc::new(PgTokenStore::new(db.clone(), None)),
                    Arc::new(GoogleTokenEndpoint::new(gmail.clone())),
                );
                let transport = Arc::new(GmailApiTransport::new(gmail.api_base.clone()));
                info!(from = %config.default_from_email, "gmail mailer enabled");
                Some(Arc::new(Mailer::new(
                    config.default_from_email.clone(),
                    credentials,
                    transport,
                )))
            }
            None => {
                warn!("GMAIL_CLIENT_ID not set; outbound mail disabled");
                None
            }
        };

        Self {
            inner: Arc::new(AppStateInner {
                db,
                redis,
                content,
                media,
                mailer,
                config: config.clone(),
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn redis(&self) -> &RedisClient {
        &self.inner.redis
    }

    pub fn content(&self) -> &ContentService {
        &self.inner.content
    }

    pub fn media(&self) -> &MediaService {
        &self.inner.media
    }

    pub fn mailer(&self) -> Option<&Arc<Mailer>> {
        self.inner.mailer.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }

    /// Check if Redis is healthy.
    pub async fn redis_healthy(&self) -> bool {
        let Ok(mut conn) = self.inner.redis.get_multiplexed_async_connection().await else {
            return false;
        };

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}
