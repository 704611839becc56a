//! Misikir: authenticated API client for the business-directory backend and
//! the Telegram login verification service.

pub mod auth;
pub mod client;
pub mod common;
pub mod logging_middleware;
