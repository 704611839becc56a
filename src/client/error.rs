//! Error types for the authenticated API client

use serde_json::Value;
use std::fmt;
use thiserror::Error;

use super::token_store::TokenStoreError;

/// Normalized error for a non-2xx backend response.
///
/// `message` is stable across backend error shapes so callers can show it
/// directly; `data` keeps the raw body for field-level handling.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub data: Value,
}

impl ApiError {
    pub fn from_body(status: u16, data: Value) -> Self {
        let message = extract_message(&data)
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        Self {
            status,
            message,
            data,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API error {}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Pulls a human-readable message out of the common backend error shapes.
///
/// Order: `detail`, `message`, `error`, then field errors rendered as
/// `field: msg1, msg2` (several fields joined with `; `).
pub fn extract_message(data: &Value) -> Option<String> {
    let obj = data.as_object()?;

    for key in ["detail", "message", "error"] {
        if let Some(msg) = obj.get(key).and_then(Value::as_str) {
            if !msg.trim().is_empty() {
                return Some(msg.to_string());
            }
        }
    }

    let field_errors: Vec<String> = obj
        .iter()
        .filter_map(|(field, value)| {
            let messages: Vec<&str> = value.as_array()?.iter().filter_map(Value::as_str).collect();
            if messages.is_empty() {
                None
            } else {
                Some(format!("{}: {}", field, messages.join(", ")))
            }
        })
        .collect();

    if field_errors.is_empty() {
        None
    } else {
        Some(field_errors.join("; "))
    }
}

/// Why a token refresh did not produce a new access token.
///
/// Cloned to every request waiting on the same refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh endpoint rejected the token with status {0}")]
    Rejected(u16),

    #[error("refresh response did not contain an access token")]
    MalformedResponse,

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh request timed out")]
    Timeout,

    #[error("could not persist refreshed token: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("session expired: {0}")]
    SessionExpired(#[from] RefreshError),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("token storage error: {0}")]
    Storage(#[from] TokenStoreError),
}

impl ClientError {
    /// HTTP status of the failed call, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(e) => Some(e.status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
