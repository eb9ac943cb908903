//! Application error types.

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::content::slug::SlugTaken;
use crate::mail::MailError;

/// Field name to list of messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("mail delivery failed")]
    Mail(#[from] MailError),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl AppError {
    /// Build a validation error for a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<SlugTaken>() {
            Ok(taken) => AppError::Conflict(taken.to_string()),
            Err(err) => AppError::Internal(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Mail(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal details are logged, never returned to the caller
        let body = match self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                ErrorBody {
                    error: "internal server error".to_string(),
                    fields: None,
                }
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                ErrorBody {
                    error: "internal server error".to_string(),
                    fields: None,
                }
            }
            AppError::Mail(e) => {
                tracing::error!(error = %e, "mail delivery failed");
                ErrorBody {
                    error: "Sorry, there was an error sending your message. Please try again later."
                        .to_string(),
                    fields: None,
                }
            }
            AppError::Validation(fields) => ErrorBody {
                error: "validation failed".to_string(),
                fields: Some(fields),
            },
            other => ErrorBody {
                error: other.to_string(),
                fields: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
