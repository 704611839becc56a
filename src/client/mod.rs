//! # Client Module
//!
//! Authenticated HTTP client for the Misikir backend:
//! - Bearer token attachment from an injected token store
//! - Single-flight access token refresh on 401, with one replay per request
//! - Normalized API errors with a stable human-readable message
//! - Logout escalation through an injected navigator

pub mod api;
pub mod error;
pub mod navigator;
pub mod refresh;
pub mod token_store;


pub use api::{ApiClient, ApiClientBuilder, ApiResponse, FormPart, RequestBody, REFRESH_PATH};
pub use error::{ApiError, ClientError, RefreshError};
pub use navigator::{LoggingNavigator, Navigator};
pub use refresh::RefreshCoordinator;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore, TokenStoreError};
