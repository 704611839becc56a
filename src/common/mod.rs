// Common module - configuration, error and logging helpers shared by the
// client and the server

pub mod config;
pub mod error;
pub mod helpers;
pub mod state;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::ServerError;
pub use helpers::safe_token_log;
pub use state::AppState;
