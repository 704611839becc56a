//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Telegram Login Widget signature verification
//! - The Telegram login endpoint that forwards verified payloads
//! - Email/password, Google and Telegram login flows on the client side
//! - Logout and current-user lookup

pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod telegram;


pub use models::{AuthUser, RegisterRequest};
pub use routes::auth_routes;
pub use session::{AuthSession, SessionError};
pub use telegram::{TelegramAuthError, TelegramVerifier};
