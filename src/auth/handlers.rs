//! Authentication handlers

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::session::TELEGRAM_SOCIAL_LOGIN_PATH;
use super::telegram::TelegramVerifier;
use crate::client::ClientError;
use crate::common::{AppState, ServerError};

/// Returned for every rejected payload, whatever the reason.
pub const INVALID_TELEGRAM_DATA: &str = "Invalid Telegram data";

/// POST /api/auth/telegram
/// Verifies a Telegram Login Widget payload and exchanges it for a session
///
/// # Request Body
/// ```json
/// {
///   "id": "123",
///   "first_name": "Abebe",
///   "auth_date": "1700000000",
///   "hash": "<hex hmac>"
/// }
/// ```
///
/// # Response
/// The backend's JSON body and status on success; `401` with
/// `{ "error": "Invalid Telegram data" }` when the signature does not check.
pub async fn telegram_login(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    body: Bytes,
) -> Result<Response, ServerError> {
    info!("🔐 Received Telegram login request");
    let state = state_lock.read().await.clone();
    let bot_token = state.config.telegram_bot_token.as_deref().unwrap_or_default();

    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        ServerError::InternalServer(format!("unreadable Telegram payload: {}", e))
    })?;
    let verifier = TelegramVerifier::new(bot_token).map_err(|e| {
        error!(error = %e, "TELEGRAM_BOT_TOKEN is not set, cannot verify Telegram logins");
        ServerError::InternalServer(e.to_string())
    })?;

    // Anything but a JSON object carries no hash.
    let payload: Map<String, Value> = match body {
        Value::Object(map) => map,
        other => {
            warn!(kind = %json_kind(&other), "Rejected non-object Telegram payload");
            return Err(ServerError::Unauthorized(INVALID_TELEGRAM_DATA.to_string()));
        }
    };

    match verifier.verify(&payload) {
        Ok(()) => {
            debug!(telegram_id = ?payload.get("id"), "Telegram signature verified");
        }
        Err(e) => {
            warn!(reason = %e, "Rejected Telegram login payload");
            return Err(ServerError::Unauthorized(INVALID_TELEGRAM_DATA.to_string()));
        }
    }

    let forwarded = state
        .backend
        .post(TELEGRAM_SOCIAL_LOGIN_PATH, &payload, false)
        .await;

    match forwarded {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
            info!(status = %status, "Backend issued Telegram session");
            Ok(match response.data {
                Some(data) => (status, Json(data)).into_response(),
                None => status.into_response(),
            })
        }
        Err(ClientError::Api(api)) => {
            warn!(
                status = api.status,
                message = %api.message,
                "Backend rejected Telegram login"
            );
            let message = if api.data.is_object() {
                api.message
            } else {
                "Telegram authentication failed".to_string()
            };
            Err(ServerError::Upstream {
                status: api.status,
                message,
            })
        }
        Err(e) => Err(ServerError::InternalServer(format!(
            "forwarding Telegram login failed: {}",
            e
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
