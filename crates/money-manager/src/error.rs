//! Failures talking to the records service

use finance_core::{Editability, RecordKind, ValidationError};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// How a request to the records service failed
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, rejected or expired token. Never retried.
    #[error("not signed in or session expired; run `money-manager login`")]
    Unauthorized,

    /// The record's edit window has closed
    #[error("this record can no longer be edited or deleted: {0}")]
    Locked(String),

    #[error("request timed out after {0:?}; please try again")]
    Timeout(Duration),

    #[error("could not reach the records service; please try again ({0})")]
    Transport(#[source] reqwest::Error),

    /// 5xx or rate limiting
    #[error("records service unavailable ({status}): {message}; please try again")]
    Server { status: u16, message: String },

    /// Any other 4xx
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// No record with that id in the last fetched list
    #[error("no {kind} record with id '{id}'")]
    NotFound { kind: RecordKind, id: String },

    #[error("unexpected response from records service: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not store session: {0}")]
    Session(#[from] std::io::Error),
}

impl ApiError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_) | ApiError::Transport(_) | ApiError::Server { .. }
        )
    }

    pub fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Transport(error)
        }
    }
}

/// Error bodies look like `{ "message": "..." }`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Best human-readable message from an error response
pub fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || status.canonical_reason().unwrap_or("unknown error").to_string();

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { message: Some(message) }) if !message.trim().is_empty() => return message,
        Ok(_) => return fallback(),
        Err(_) => {}
    }

    let body = body.trim();
    if !body.is_empty() && body.len() <= 200 && !body.starts_with('<') {
        body.to_string()
    } else {
        fallback()
    }
}

/// What kind of request produced an error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Unauthenticated call (login)
    Anonymous,
    /// Authenticated read or create
    Authenticated,
    /// Edit or delete; carries the local edit-window verdict at response time
    Mutation(Editability),
}

/// Map a non-success response to an error
pub fn classify(status: StatusCode, body: &str, kind: RequestKind) -> ApiError {
    let message = error_message(status, body);

    if status == StatusCode::UNAUTHORIZED && kind != RequestKind::Anonymous {
        return ApiError::Unauthorized;
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return ApiError::Server {
            status: status.as_u16(),
            message,
        };
    }
    if let RequestKind::Mutation(editability) = kind {
        let window_rejection = status == StatusCode::FORBIDDEN || status == StatusCode::CONFLICT;
        // Any client error on a record our own clock already considers locked
        // is the edit window, whatever status the service picked.
        if window_rejection || (status.is_client_error() && editability == Editability::Locked) {
            return ApiError::Locked(message);
        }
    }

    ApiError::Rejected {
        status: status.as_u16(),
        message,
    }
}
