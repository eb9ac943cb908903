//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Default Google OAuth2 token endpoint.
pub const DEFAULT_GMAIL_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Default Gmail REST API base URL.
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Redis connection URL (sessions).
    pub redis_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Path to uploads directory (default: ./uploads).
    pub uploads_dir: PathBuf,

    /// Base URL for serving uploaded files (default: /media).
    pub files_url: String,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,

    /// Public site URL.
    pub site_url: String,

    /// From address for outgoing email; also receives contact notifications.
    pub default_from_email: String,

    /// Address that receives new-comment notifications.
    pub contact_email: String,

    /// Gmail API settings. When None, outbound mail is disabled.
    pub gmail: Option<GmailConfig>,
}

/// OAuth2 client settings for the Gmail API.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub api_base: String,
    /// Redirect URI registered for the installed-app flow.
    pub redirect_uri: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let files_url = env::var("FILES_URL").unwrap_or_else(|_| "/media".to_string());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        let site_url = env::var("SITE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let default_from_email =
            env::var("DEFAULT_FROM_EMAIL").unwrap_or_else(|_| "noreply@localhost".to_string());

        let contact_email = env::var("CONTACT_EMAIL").unwrap_or_else(|_| default_from_email.clone());

        let gmail = gmail_from_env();

        Ok(Self {
            port,
            database_url,
            redis_url,
            database_max_connections,
            uploads_dir,
            files_url,
            cors_allowed_origins,
            cookie_same_site,
            site_url,
            default_from_email,
            contact_email,
            gmail,
        })
    }
}

/// Gmail settings are only enabled when both client id and secret are present.
fn gmail_from_env() -> Option<GmailConfig> {
    let client_id = env::var("GMAIL_CLIENT_ID").ok().filter(|s| !s.is_empty())?;
    let client_secret = env::var("GMAIL_CLIENT_SECRET")
        .ok()
        .filter(|s| !s.is_empty())?;

    Some(GmailConfig {
        client_id,
        client_secret,
        token_uri: env::var("GMAIL_TOKEN_URI")
            .unwrap_or_else(|_| DEFAULT_GMAIL_TOKEN_URI.to_string()),
        api_base: env::var("GMAIL_API_BASE").unwrap_or_else(|_| DEFAULT_GMAIL_API_BASE.to_string()),
        redirect_uri: env::var("GMAIL_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8080/".to_string()),
    })
}
