//! Authentication data models

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::client::TokenPair;

/// Email/password login request
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account registration request. Business owners register the same way
/// and flag themselves with `is_business_owner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_business_owner: bool,
}

/// Authenticated user as returned by the backend.
///
/// `id` is always populated; older endpoints only send `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Remaining profile fields, passed through untouched
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl AuthUser {
    /// Builds a user from a raw backend object, mapping `user_id` to `id`.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => return serde_json::from_value(other),
        };

        let has_id = obj.get("id").map(|v| !v.is_null()).unwrap_or(false);
        if !has_id {
            if let Some(user_id) = obj.remove("user_id") {
                obj.insert("id".to_string(), user_id);
            }
        }

        serde_json::from_value(Value::Object(obj))
    }
}

/// Token pair and user extracted from a login-type response.
///
/// Accepts `{ tokens: { access, refresh }, user }` as well as top-level
/// `access`/`refresh`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthPayload {
    pub tokens: TokenPair,
    pub user: Option<AuthUser>,
}

impl AuthPayload {
    pub fn from_value(value: &Value) -> Option<Self> {
        let source = value.get("tokens").unwrap_or(value);
        let access = source.get("access").and_then(Value::as_str)?;
        let refresh = source.get("refresh").and_then(Value::as_str)?;

        let user = value
            .get("user")
            .cloned()
            .and_then(|u| AuthUser::from_value(u).ok());

        Some(Self {
            tokens: TokenPair {
                access: access.to_string(),
                refresh: refresh.to_string(),
            },
            user,
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
