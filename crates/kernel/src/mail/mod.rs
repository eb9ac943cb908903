//! Outbound mail through the Gmail API.
//!
//! - `gmail`: OAuth2 token persistence, refresh, and the authorization-code exchange
//! - `mailer`: message formatting and delivery
//! - `contact`: contact-form and comment-notification messages

pub mod contact;
pub mod gmail;
pub mod mailer;

use thiserror::Error;

pub use gmail::{
    GmailCredentials, GoogleTokenEndpoint, MemoryTokenStore, PgTokenStore, StoredToken,
    TokenEndpoint, TokenGrant, TokenState, TokenStore,
};
pub use mailer::{Email, GmailApiTransport, MailTransport, Mailer};

/// Mail delivery errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// No Gmail client settings are present.
    #[error("mail delivery is not configured")]
    NotConfigured,

    /// No usable token; an operator must authorize again.
    #[error("Gmail credentials are invalid or expired. Please run: atelier gmail-token")]
    CredentialsInvalid,

    #[error("token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("Gmail API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid message: {0}")]
    Message(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token store error: {0:#}")]
    Store(anyhow::Error),
}
