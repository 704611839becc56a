// src/logging_middleware.rs
//! Request logging: one span per request with a request id, plus body
//! logging at debug level with signatures and credentials masked

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::common::helpers::redact_json;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that tags each request with an id and logs its outcome
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    );

    async move {
        let started = Instant::now();
        let (parts, body) = request.into_parts();

        let bytes = to_bytes(body, usize::MAX)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        if !bytes.is_empty() {
            match serde_json::from_slice::<serde_json::Value>(&bytes) {
                Ok(json) => debug!(request_body = %redact_json(&json), "📥 Request"),
                Err(_) => debug!(request_bytes = bytes.len(), "📥 Request (non-JSON body)"),
            }
        }

        let request = Request::from_parts(parts, Body::from(bytes));
        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        info!(
            status = %response.status(),
            latency_ms = started.elapsed().as_millis() as u64,
            "📤 Response"
        );

        Ok::<Response, StatusCode>(response)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::post, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn(log_request_response))
    }

    #[tokio::test]
    async fn test_request_id_is_generated_and_body_preserved() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from(r#"{"hash":"abc","id":1}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"hash":"abc","id":1}"#);
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
    }

    #[tokio::test]
    async fn test_large_body_passes_through() {
        let payload = "x".repeat(256 * 1024);
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from(payload.clone()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), payload.len());
    }
}
