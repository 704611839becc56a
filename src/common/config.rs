// Environment configuration for the server and the API client

use std::env;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Absent when `TELEGRAM_BOT_TOKEN` is unset or blank; the Telegram
    /// endpoint then answers every request with a generic server error.
    pub telegram_bot_token: Option<String>,
    pub backend_url: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub refresh_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend_url = non_empty("BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let port = non_empty("PORT")
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let cors_origins = non_empty("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let refresh_timeout = non_empty("REFRESH_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REFRESH_TIMEOUT_SECS));

        Self {
            telegram_bot_token: non_empty("TELEGRAM_BOT_TOKEN"),
            backend_url,
            port,
            cors_origins,
            refresh_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]);

        assert!(config.telegram_bot_token.is_none());
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.refresh_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_values_from_environment() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("BACKEND_URL", "https://api.misikir.et/"),
            ("PORT", "8081"),
            ("CORS_ORIGINS", "https://misikir.et, https://www.misikir.et"),
            ("REFRESH_TIMEOUT_SECS", "5"),
        ]);

        assert_eq!(config.telegram_bot_token.as_deref(), Some("123:ABC"));
        assert_eq!(config.backend_url, "https://api.misikir.et");
        assert_eq!(config.port, 8081);
        assert_eq!(
            config.cors_origins,
            vec!["https://misikir.et", "https://www.misikir.et"]
        );
        assert_eq!(config.refresh_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_bot_token_counts_as_missing() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "   "), ("PORT", "not-a-port")]);

        assert!(config.telegram_bot_token.is_none());
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
