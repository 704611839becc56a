//! Authenticated request pipeline
//!
//! Every backend call goes through [`ApiClient::request`]. Authenticated
//! calls carry `Authorization: Bearer <access>`; a 401 on such a call
//! triggers one coordinated refresh, after which the call is replayed once
//! with the new token.

use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Method, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::{ApiError, ClientError, RefreshError};
use super::navigator::{LoggingNavigator, Navigator};
use super::refresh::RefreshCoordinator;
use super::token_store::{MemoryTokenStore, TokenPair, TokenStore};
use crate::common::safe_token_log;

/// Backend endpoint that exchanges a refresh token for a new access token.
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Request payload. Multipart parts are kept as plain data so the body can
/// be rebuilt when a request is replayed after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: Option<String>,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> Self {
        FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime: mime.map(str::to_string),
        }
    }
}

/// Successful backend response. `data` is `None` for 204 and empty bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        serde_json::from_value(self.data.unwrap_or(Value::Null))
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Everything a refresh needs, detached from the client so the shared
/// refresh future does not keep the client alive.
#[derive(Clone)]
struct RefreshContext {
    http: Client,
    url: String,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    timeout: Duration,
}

impl RefreshContext {
    async fn call_endpoint(&self) -> Result<String, RefreshError> {
        let refresh = self
            .tokens
            .refresh_token()
            .await
            .ok_or(RefreshError::NoRefreshToken)?;

        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status.as_u16()));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|_| RefreshError::MalformedResponse)?;
        if body.access.is_empty() {
            return Err(RefreshError::MalformedResponse);
        }

        let stored = match body.refresh {
            Some(rotated) if !rotated.is_empty() => {
                self.tokens
                    .set_tokens(TokenPair {
                        access: body.access.clone(),
                        refresh: rotated,
                    })
                    .await
            }
            _ => self.tokens.set_access_token(body.access.clone()).await,
        };
        stored.map_err(|e| RefreshError::Storage(e.to_string()))?;

        Ok(body.access)
    }

    async fn refresh(self) -> Result<String, RefreshError> {
        let outcome = match tokio::time::timeout(self.timeout, self.call_endpoint()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::Timeout),
        };

        match outcome {
            Ok(access) => {
                info!(token = %safe_token_log(&access), "Access token refreshed");
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                if let Err(store_err) = self.tokens.clear().await {
                    error!(error = %store_err, "Failed to clear tokens after refresh failure");
                }
                self.navigator.redirect_to_login();
                Err(e)
            }
        }
    }
}

struct Inner {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    refresh: RefreshCoordinator,
    refresh_timeout: Duration,
}

/// HTTP client for the Misikir backend. Cheap to clone; clones share the
/// token store and the refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

pub struct ApiClientBuilder {
    base_url: String,
    http: Option<Client>,
    tokens: Option<Arc<dyn TokenStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    refresh_timeout: Duration,
}

impl ApiClientBuilder {
    pub fn http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn build(self) -> ApiClient {
        let http = self.http.unwrap_or_else(|| {
            Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new())
        });

        ApiClient {
            inner: Arc::new(Inner {
                http,
                base_url: self.base_url.trim_end_matches('/').to_string(),
                tokens: self
                    .tokens
                    .unwrap_or_else(|| Arc::new(MemoryTokenStore::new())),
                navigator: self
                    .navigator
                    .unwrap_or_else(|| Arc::new(LoggingNavigator::default())),
                refresh: RefreshCoordinator::new(),
                refresh_timeout: self.refresh_timeout,
            }),
        }
    }
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            http: None,
            tokens: None,
            navigator: None,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.inner.tokens
    }

    pub async fn refresh_in_flight(&self) -> bool {
        self.inner.refresh.in_flight().await
    }

    /// Absolute URLs pass through untouched; anything else is joined to the
    /// base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.inner.base_url, path)
        } else {
            format!("{}/{}", self.inner.base_url, path)
        }
    }

    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<RequestBody>,
        auth: bool,
    ) -> Result<ApiResponse, ClientError> {
        let token = if auth {
            self.inner.tokens.access_token().await
        } else {
            None
        };

        let response = self
            .send(path, method.clone(), body.as_ref(), token.as_deref())
            .await?;

        if auth && response.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %path, "Access token rejected, recovering session");
            let fresh = self.recover_session(token).await?;
            let retried = self.send(path, method, body.as_ref(), Some(&fresh)).await?;
            return read_response(retried).await;
        }

        read_response(response).await
    }

    pub async fn get(&self, path: &str, auth: bool) -> Result<ApiResponse, ClientError> {
        self.request(path, Method::GET, None, auth).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: bool,
    ) -> Result<ApiResponse, ClientError> {
        self.request(path, Method::POST, Some(json_body(body)?), auth)
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: bool,
    ) -> Result<ApiResponse, ClientError> {
        self.request(path, Method::PUT, Some(json_body(body)?), auth)
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: bool,
    ) -> Result<ApiResponse, ClientError> {
        self.request(path, Method::PATCH, Some(json_body(body)?), auth)
            .await
    }

    pub async fn delete(&self, path: &str, auth: bool) -> Result<ApiResponse, ClientError> {
        self.request(path, Method::DELETE, None, auth).await
    }

    /// Sends a multipart form; the transport sets the boundary header.
    pub async fn upload(
        &self,
        path: &str,
        method: Method,
        parts: Vec<FormPart>,
        auth: bool,
    ) -> Result<ApiResponse, ClientError> {
        self.request(path, method, Some(RequestBody::Multipart(parts)), auth)
            .await
    }

    /// Returns the token the failed call should be replayed with.
    async fn recover_session(&self, used: Option<String>) -> Result<String, ClientError> {
        // Another caller already refreshed since this request was sent.
        match self.inner.tokens.access_token().await {
            Some(current) if used.as_deref() != Some(current.as_str()) => {
                debug!("Access token changed while request was in flight, replaying");
                return Ok(current);
            }
            Some(_) => {}
            None => {
                // Another caller already ended the session and redirected.
                let cleared = self.inner.tokens.refresh_token().await.is_none();
                if used.is_some() && cleared {
                    debug!("Session ended while request was in flight");
                    return Err(ClientError::SessionExpired(RefreshError::NoRefreshToken));
                }
            }
        }

        let ctx = RefreshContext {
            http: self.inner.http.clone(),
            url: self.url_for(REFRESH_PATH),
            tokens: self.inner.tokens.clone(),
            navigator: self.inner.navigator.clone(),
            timeout: self.inner.refresh_timeout,
        };

        let token = self.inner.refresh.run(move || ctx.refresh()).await?;
        Ok(token)
    }

    async fn send(
        &self,
        path: &str,
        method: Method,
        body: Option<&RequestBody>,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = self.url_for(path);
        debug!(
            method = %method,
            url = %url,
            authenticated = token.is_some(),
            "Sending API request"
        );

        let mut request = self.inner.http.request(method, &url);
        request = match body {
            Some(RequestBody::Multipart(parts)) => request.multipart(build_form(parts)?),
            Some(RequestBody::Json(value)) => request
                .header(CONTENT_TYPE, "application/json")
                .body(
                    serde_json::to_vec(value)
                        .map_err(|e| ClientError::InvalidRequest(e.to_string()))?,
                ),
            None => request.header(CONTENT_TYPE, "application/json"),
        };
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        Ok(request.send().await?)
    }
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<RequestBody, ClientError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| ClientError::InvalidRequest(e.to_string()))
}

fn build_form(parts: &[FormPart]) -> Result<Form, ClientError> {
    parts.iter().try_fold(Form::new(), |form, part| match part {
        FormPart::Text { name, value } => Ok(form.text(name.clone(), value.clone())),
        FormPart::File {
            name,
            file_name,
            bytes,
            mime,
        } => {
            let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
            if let Some(mime) = mime {
                file = file
                    .mime_str(mime)
                    .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
            }
            Ok(form.part(name.clone(), file))
        }
    })
}

async fn read_response(response: Response) -> Result<ApiResponse, ClientError> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(ApiResponse {
            status: status.as_u16(),
            data: None,
        });
    }

    let bytes = response.bytes().await?;

    if status.is_success() {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(ApiResponse {
                status: status.as_u16(),
                data: None,
            });
        }
        let data = serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
        return Ok(ApiResponse {
            status: status.as_u16(),
            data: Some(data),
        });
    }

    let data = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        }
    });

    let error = ApiError::from_body(status.as_u16(), data);
    debug!(status = error.status, message = %error.message, "API request failed");
    Err(error.into())
}
