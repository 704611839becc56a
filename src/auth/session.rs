//! Client-side login flows built on [`ApiClient`]
//!
//! Every successful login-type call stores the returned token pair in the
//! client's token store; logout clears it.

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{AuthPayload, AuthUser, LoginRequest, RegisterRequest};
use crate::client::{ApiClient, ClientError, TokenStoreError};

pub const LOGIN_PATH: &str = "/api/auth/login/";
pub const REGISTER_PATH: &str = "/api/auth/register/";
pub const LOGOUT_PATH: &str = "/api/auth/logout/";
pub const CURRENT_USER_PATH: &str = "/api/auth/me/";
pub const GOOGLE_LOGIN_PATH: &str = "/api/auth/social/google/";
/// Backend endpoint that issues a session for a verified Telegram payload.
pub const TELEGRAM_SOCIAL_LOGIN_PATH: &str = "/api/auth/social/telegram/";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("token storage error: {0}")]
    Storage(#[from] TokenStoreError),

    #[error("login response did not contain a token pair")]
    MissingTokens,

    #[error("login response did not contain a valid user")]
    MissingUser,
}

/// Login, registration and logout against the Misikir backend.
#[derive(Clone)]
pub struct AuthSession {
    client: ApiClient,
    telegram_verify_url: String,
}

impl AuthSession {
    /// `telegram_verify_url` is the verification endpoint that checks the
    /// widget signature before the backend sees the payload.
    pub fn new(client: ApiClient, telegram_verify_url: impl Into<String>) -> Self {
        Self {
            client,
            telegram_verify_url: telegram_verify_url.into(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, SessionError> {
        debug!("Submitting email login");
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.client.post(LOGIN_PATH, &request, false).await?;
        self.establish(response.data).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthUser, SessionError> {
        debug!(business_owner = request.is_business_owner, "Submitting registration");
        let response = self.client.post(REGISTER_PATH, request, false).await?;
        self.establish(response.data).await
    }

    /// Sends the raw widget payload to the verification endpoint.
    pub async fn telegram_login(
        &self,
        payload: &Map<String, Value>,
    ) -> Result<AuthUser, SessionError> {
        debug!(url = %self.telegram_verify_url, "Submitting Telegram login");
        let response = self
            .client
            .post(&self.telegram_verify_url, payload, false)
            .await?;
        self.establish(response.data).await
    }

    /// External URL that starts the Google sign-in redirect.
    pub fn google_login_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?redirect_uri={}",
            self.client.url_for(GOOGLE_LOGIN_PATH),
            urlencoding::encode(redirect_uri)
        )
    }

    /// Completes the Google redirect: the backend hands the tokens back on
    /// the redirect URI.
    pub async fn complete_google_login(
        &self,
        access: &str,
        refresh: &str,
    ) -> Result<AuthUser, SessionError> {
        self.establish(Some(json!({ "access": access, "refresh": refresh })))
            .await
    }

    pub async fn current_user(&self) -> Result<AuthUser, SessionError> {
        let response = self.client.get(CURRENT_USER_PATH, true).await?;
        let value = response.data.ok_or(SessionError::MissingUser)?;
        AuthUser::from_value(value).map_err(|_| SessionError::MissingUser)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.tokens().access_token().await.is_some()
    }

    /// Tells the backend to blacklist the refresh token, then clears local
    /// tokens whatever the backend said.
    pub async fn logout(&self) -> Result<(), SessionError> {
        if let Some(refresh) = self.client.tokens().refresh_token().await {
            if let Err(e) = self
                .client
                .post(LOGOUT_PATH, &json!({ "refresh": refresh }), true)
                .await
            {
                warn!(error = %e, "Backend logout failed, clearing local session anyway");
            }
        }

        self.client.tokens().clear().await?;
        info!("Session cleared");
        Ok(())
    }

    async fn establish(&self, data: Option<Value>) -> Result<AuthUser, SessionError> {
        let data = data.ok_or(SessionError::MissingTokens)?;
        let payload = AuthPayload::from_value(&data).ok_or(SessionError::MissingTokens)?;

        self.client.tokens().set_tokens(payload.tokens).await?;

        match payload.user {
            Some(user) => {
                info!(user_id = %user.id, "Session established");
                Ok(user)
            }
            None => self.current_user().await,
        }
    }
}
