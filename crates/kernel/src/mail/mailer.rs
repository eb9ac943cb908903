//! Message formatting and Gmail API delivery.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use lettre::Message;
use lettre::message::MultiPart;
use lettre::message::header::ContentType;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::MailError;
use super::gmail::GmailCredentials;

/// An outgoing email.
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
    /// Plain-text alternative; HTML only when None.
    pub text: Option<String>,
    pub reply_to: Option<String>,
}

/// Format an RFC 5322 message.
pub fn build_message(from: &str, email: &Email) -> Result<Vec<u8>, MailError> {
    let mut builder = Message::builder()
        .from(
            from.parse()
                .map_err(|e| MailError::Message(format!("invalid from address: {e}")))?,
        )
        .to(email
            .to
            .parse()
            .map_err(|e| MailError::Message(format!("invalid recipient address: {e}")))?)
        .subject(email.subject.clone());

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(
            reply_to
                .parse()
                .map_err(|e| MailError::Message(format!("invalid reply-to address: {e}")))?,
        );
    }

    let message = match &email.text {
        Some(text) => builder.multipart(MultiPart::alternative_plain_html(
            text.clone(),
            email.html.clone(),
        )),
        None => builder
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone()),
    }
    .map_err(|e| MailError::Message(e.to_string()))?;

    Ok(message.formatted())
}

/// Gmail's `raw` field: URL-safe base64 of the full message.
pub fn encode_raw(message: &[u8]) -> String {
    URL_SAFE.encode(message)
}

/// Delivers one encoded message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send a `raw` message; returns the provider's message id.
    async fn send_raw(&self, access_token: &str, raw: &str) -> Result<String, MailError>;
}

/// `users/me/messages/send` on the Gmail REST API.
pub struct GmailApiTransport {
    client: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

impl GmailApiTransport {
    pub fn new(api_base: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl MailTransport for GmailApiTransport {
    async fn send_raw(&self, access_token: &str, raw: &str) -> Result<String, MailError> {
        let url = format!(
            "{}/users/me/messages/send",
            self.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<SendResponse>().await?.id)
    }
}

/// Sends mail as the configured sender.
#[derive(Clone)]
pub struct Mailer {
    from: String,
    credentials: GmailCredentials,
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    pub fn new(
        from: impl Into<String>,
        credentials: GmailCredentials,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        Self {
            from: from.into(),
            credentials,
            transport,
        }
    }

    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// Send each message, returning how many were delivered.
    ///
    /// With `fail_silently`, credential and per-message failures are logged
    /// and skipped; otherwise the first failure is returned.
    pub async fn send_messages(
        &self,
        messages: &[Email],
        fail_silently: bool,
    ) -> Result<usize, MailError> {
        if messages.is_empty() {
            return Ok(0);
        }

        let access_token = match self.credentials.access_token().await {
            Ok(token) => token,
            Err(e) if fail_silently => {
                warn!(error = %e, "gmail credentials unavailable; mail dropped");
                return Ok(0);
            }
            Err(e) => {
                error!(error = %e, "gmail credentials unavailable");
                return Err(e);
            }
        };

        let mut sent = 0;
        for email in messages {
            match self.send_one(&access_token, email).await {
                Ok(message_id) => {
                    info!(message_id = %message_id, subject = %email.subject, "email sent");
                    sent += 1;
                }
                Err(e) if fail_silently => {
                    warn!(error = %e, subject = %email.subject, "failed to send email");
                }
                Err(e) => {
                    error!(error = %e, subject = %email.subject, "failed to send email");
                    return Err(e);
                }
            }
        }

        Ok(sent)
    }

    /// Send a single message.
    pub async fn send(&self, email: Email, fail_silently: bool) -> Result<bool, MailError> {
        Ok(self.send_messages(&[email], fail_silently).await? == 1)
    }

    async fn send_one(&self, access_token: &str, email: &Email) -> Result<String, MailError> {
        let raw = encode_raw(&build_message(&self.from, email)?);
        self.transport.send_raw(access_token, &raw).await
    }
}
