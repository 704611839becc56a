//! Telegram Login Widget signature verification
//!
//! The widget signs its payload with HMAC-SHA256. The key is the SHA-256
//! digest of the bot token; the message is the check string built from all
//! fields except `hash`.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Payload field carrying the claimed signature.
pub const HASH_FIELD: &str = "hash";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelegramAuthError {
    #[error("Telegram bot token is not configured")]
    NotConfigured,

    #[error("payload has no hash field")]
    MissingHash,

    #[error("field {0} is not a primitive value")]
    UnsupportedValue(String),

    #[error("signature does not match payload")]
    SignatureMismatch,
}

pub struct TelegramVerifier {
    secret_key: [u8; 32],
}

impl fmt::Debug for TelegramVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramVerifier")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl TelegramVerifier {
    /// Derives the HMAC key from the bot token.
    ///
    /// A blank token is a configuration error, never a verification failure.
    pub fn new(bot_token: &str) -> Result<Self, TelegramAuthError> {
        if bot_token.trim().is_empty() {
            return Err(TelegramAuthError::NotConfigured);
        }

        Ok(Self {
            secret_key: Sha256::digest(bot_token.as_bytes()).into(),
        })
    }

    /// Renders every field except `hash` as `key=value`, sorted by key and
    /// joined with `\n` (no trailing newline).
    pub fn check_string(payload: &Map<String, Value>) -> Result<String, TelegramAuthError> {
        let mut lines = payload
            .iter()
            .filter(|(key, _)| key.as_str() != HASH_FIELD)
            .map(|(key, value)| Ok((key.as_str(), render_value(key, value)?)))
            .collect::<Result<Vec<_>, TelegramAuthError>>()?;

        lines.sort_by(|a, b| a.0.cmp(b.0));

        Ok(lines
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Lowercase hex HMAC-SHA256 of the payload's check string.
    pub fn sign(&self, payload: &Map<String, Value>) -> Result<String, TelegramAuthError> {
        let mut mac = self.mac();
        mac.update(Self::check_string(payload)?.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Accepts the payload only if `hash` is exactly the lowercase hex
    /// signature of the remaining fields.
    pub fn verify(&self, payload: &Map<String, Value>) -> Result<(), TelegramAuthError> {
        let submitted = payload
            .get(HASH_FIELD)
            .and_then(Value::as_str)
            .ok_or(TelegramAuthError::MissingHash)?;

        // Exact string equality with the lowercase encoding; uppercase or
        // malformed hex never matches.
        if !is_lowercase_hex_digest(submitted) {
            return Err(TelegramAuthError::SignatureMismatch);
        }
        let claimed = hex::decode(submitted).map_err(|_| TelegramAuthError::SignatureMismatch)?;

        let mut mac = self.mac();
        mac.update(Self::check_string(payload)?.as_bytes());
        mac.verify_slice(&claimed)
            .map_err(|_| TelegramAuthError::SignatureMismatch)
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size")
    }
}

fn render_value(key: &str, value: &Value) -> Result<String, TelegramAuthError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Array(_) | Value::Object(_) => {
            Err(TelegramAuthError::UnsupportedValue(key.to_string()))
        }
    }
}

fn is_lowercase_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
