//! Gmail OAuth2 credentials.
//!
//! A stored token is in one of three states (see [`TokenState`]). Sending
//! with a valid token uses it directly; an expired token with a refresh token
//! is exchanged at the token endpoint and the result persisted; anything else
//! fails with [`MailError::CredentialsInvalid`]. New authorization happens only
//! through the `atelier gmail-token` command.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::MailError;
use crate::config::GmailConfig;
use crate::models::GmailToken;

/// Scopes requested during authorization.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.modify",
];

/// Google's consent page.
pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Tokens expiring within this many seconds are treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// A persisted access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

/// Usability of a stored token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    ExpiredWithRefresh,
    Invalid,
}

impl StoredToken {
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        let fresh = self.expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now;
        if fresh && !self.access_token.is_empty() {
            TokenState::Valid
        } else if self.refresh_token.as_deref().is_some_and(|r| !r.is_empty()) {
            TokenState::ExpiredWithRefresh
        } else {
            TokenState::Invalid
        }
    }

    /// Build the token to persist from a grant.
    ///
    /// Keeps `previous_refresh` when the grant carries no refresh token.
    pub fn from_grant(grant: TokenGrant, previous_refresh: Option<&str>, now: DateTime<Utc>) -> Self {
        let refresh_token = grant
            .refresh_token
            .filter(|r| !r.is_empty())
            .or_else(|| previous_refresh.map(str::to_string));

        Self {
            access_token: grant.access_token,
            refresh_token,
            expiry: now + Duration::seconds(grant.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS)),
        }
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Where the token lives between sends.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<StoredToken>>;
    async fn save(&self, token: &StoredToken) -> anyhow::Result<()>;
}

/// The OAuth2 token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, MailError>;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, MailError>;
}

/// Token row in Postgres. `user_id` None selects the site token.
pub struct PgTokenStore {
    pool: PgPool,
    user_id: Option<Uuid>,
}

impl PgTokenStore {
    pub fn new(pool: PgPool, user_id: Option<Uuid>) -> Self {
        Self { pool, user_id }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn load(&self) -> anyhow::Result<Option<StoredToken>> {
        let row = GmailToken::find(&self.pool, self.user_id).await?;
        Ok(row.map(|t| StoredToken {
            access_token: t.access_token,
            refresh_token: Some(t.refresh_token).filter(|r| !r.is_empty()),
            expiry: t.token_expiry,
        }))
    }

    async fn save(&self, token: &StoredToken) -> anyhow::Result<()> {
        GmailToken::upsert(
            &self.pool,
            self.user_id,
            &token.access_token,
            token.refresh_token.as_deref().unwrap_or_default(),
            token.expiry,
        )
        .await
    }
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<StoredToken>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<StoredToken>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    pub fn current(&self) -> Option<StoredToken> {
        self.token.lock().clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> anyhow::Result<Option<StoredToken>> {
        Ok(self.current())
    }

    async fn save(&self, token: &StoredToken) -> anyhow::Result<()> {
        *self.token.lock() = Some(token.clone());
        Ok(())
    }
}

/// Google's OAuth2 token endpoint.
pub struct GoogleTokenEndpoint {
    client: reqwest::Client,
    config: GmailConfig,
}

impl GoogleTokenEndpoint {
    pub fn new(config: GmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<TokenGrant, MailError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        let response = self
            .client
            .post(&self.config.token_uri)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MailError::TokenEndpoint(format!("{status}: {text}")));
        }

        Ok(response.json::<TokenGrant>().await?)
    }
}

#[async_trait]
impl TokenEndpoint for GoogleTokenEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, MailError> {
        self.post_form(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, MailError> {
        self.post_form(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .await
    }
}

/// Consent URL requesting offline access with a forced consent prompt, so
/// Google issues a refresh token.
pub fn consent_url(config: &GmailConfig) -> anyhow::Result<String> {
    let scope = SCOPES.join(" ");
    let url = url::Url::parse_with_params(
        AUTH_URI,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .context("failed to build consent URL")?;

    Ok(url.into())
}

/// Loads, refreshes and persists the sender's token.
#[derive(Clone)]
pub struct GmailCredentials {
    store: Arc<dyn TokenStore>,
    endpoint: Arc<dyn TokenEndpoint>,
}

impl GmailCredentials {
    pub fn new(store: Arc<dyn TokenStore>, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self { store, endpoint }
    }

    /// A usable access token, refreshing and persisting if needed.
    pub async fn access_token(&self) -> Result<String, MailError> {
        let token = self
            .store
            .load()
            .await
            .map_err(MailError::Store)?
            .ok_or(MailError::CredentialsInvalid)?;

        let now = Utc::now();
        match token.state(now) {
            TokenState::Valid => Ok(token.access_token),
            TokenState::ExpiredWithRefresh => self.refresh(token, now).await,
            TokenState::Invalid => Err(MailError::CredentialsInvalid),
        }
    }

    async fn refresh(&self, token: StoredToken, now: DateTime<Utc>) -> Result<String, MailError> {
        let previous = token.refresh_token.unwrap_or_default();

        let grant = match self.endpoint.refresh(&previous).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "gmail token refresh failed");
                return Err(MailError::CredentialsInvalid);
            }
        };

        let refreshed = StoredToken::from_grant(grant, Some(&previous), now);
        self.store.save(&refreshed).await.map_err(MailError::Store)?;

        info!(expiry = %refreshed.expiry, "gmail token refreshed");
        Ok(refreshed.access_token)
    }

    /// Complete the installed-app flow with an authorization code.
    pub async fn authorize(&self, code: &str) -> Result<StoredToken, MailError> {
        let grant = self.endpoint.exchange_code(code.trim()).await?;
        let token = StoredToken::from_grant(grant, None, Utc::now());
        if token.refresh_token.is_none() {
            warn!("authorization returned no refresh token; the token cannot be renewed");
        }
        self.store.save(&token).await.map_err(MailError::Store)?;

        info!(expiry = %token.expiry, "gmail token stored");
        Ok(token)
    }
}
