//! Token storage for the API client
//!
//! The client never touches storage directly; everything goes through the
//! [`TokenStore`] handed to it at construction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("token file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn access_token(&self) -> Option<String>;

    async fn refresh_token(&self) -> Option<String>;

    /// Stores both tokens after a login-type response.
    async fn set_tokens(&self, pair: TokenPair) -> Result<(), TokenStoreError>;

    /// Replaces the access token after a refresh, keeping the refresh token.
    async fn set_access_token(&self, access: String) -> Result<(), TokenStoreError>;

    async fn clear(&self) -> Result<(), TokenStoreError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct StoredTokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<StoredTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(StoredTokens {
                access: Some(pair.access),
                refresh: Some(pair.refresh),
            }),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access.clone()
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.refresh.clone()
    }

    async fn set_tokens(&self, pair: TokenPair) -> Result<(), TokenStoreError> {
        let mut tokens = self.tokens.write().await;
        tokens.access = Some(pair.access);
        tokens.refresh = Some(pair.refresh);
        Ok(())
    }

    async fn set_access_token(&self, access: String) -> Result<(), TokenStoreError> {
        self.tokens.write().await.access = Some(access);
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        *self.tokens.write().await = StoredTokens::default();
        Ok(())
    }
}

/// Token store persisted as a small JSON object keyed by
/// [`ACCESS_TOKEN_KEY`] and [`REFRESH_TOKEN_KEY`].
///
/// Reads are served from memory; every mutation rewrites the file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    tokens: RwLock<StoredTokens>,
}

impl FileTokenStore {
    /// Opens the store, loading tokens from `path` if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TokenStoreError> {
        let path = path.as_ref().to_path_buf();
        let tokens = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let map: Map<String, Value> = serde_json::from_slice(&bytes)?;
                let get = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
                StoredTokens {
                    access: get(ACCESS_TOKEN_KEY),
                    refresh: get(REFRESH_TOKEN_KEY),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredTokens::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), has_access = tokens.access.is_some(), "Opened token file");

        Ok(Self {
            path,
            tokens: RwLock::new(tokens),
        })
    }

    async fn persist(&self, tokens: &StoredTokens) -> Result<(), TokenStoreError> {
        let mut map = Map::new();
        if let Some(access) = &tokens.access {
            map.insert(ACCESS_TOKEN_KEY.to_string(), Value::String(access.clone()));
        }
        if let Some(refresh) = &tokens.refresh {
            map.insert(REFRESH_TOKEN_KEY.to_string(), Value::String(refresh.clone()));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, serde_json::to_vec(&map)?).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access.clone()
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.refresh.clone()
    }

    async fn set_tokens(&self, pair: TokenPair) -> Result<(), TokenStoreError> {
        let mut tokens = self.tokens.write().await;
        let next = StoredTokens {
            access: Some(pair.access),
            refresh: Some(pair.refresh),
        };
        self.persist(&next).await?;
        *tokens = next;
        Ok(())
    }

    async fn set_access_token(&self, access: String) -> Result<(), TokenStoreError> {
        let mut tokens = self.tokens.write().await;
        let next = StoredTokens {
            access: Some(access),
            refresh: tokens.refresh.clone(),
        };
        self.persist(&next).await?;
        *tokens = next;
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        let mut tokens = self.tokens.write().await;
        *tokens = StoredTokens::default();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
