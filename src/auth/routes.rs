//! Authentication routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/telegram` - Telegram Login Widget verification
pub fn auth_routes() -> Router {
    Router::new().route("/api/auth/telegram", post(handlers::telegram_login))
}
