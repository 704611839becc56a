// Application state shared across handlers

use crate::client::ApiClient;

use super::config::AppConfig;

/// Server configuration plus the backend client used for forwarding
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub backend: ApiClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let backend = ApiClient::builder(config.backend_url.clone())
            .refresh_timeout(config.refresh_timeout)
            .build();

        Self { config, backend }
    }
}
