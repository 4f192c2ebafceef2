// src/simplestore.rs

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing::{info, warn};
use yup_oauth2::error::TokenStorageError;
use yup_oauth2::storage::{TokenInfo, TokenStorage};

use crate::config::{Config, GmailConfig};

/// Serves the current token and writes refreshed access tokens back into the
/// config file, so the next run starts from them.
pub struct ConfigTokenStore {
    token: Mutex<TokenInfo>,
    config_path: PathBuf,
}

impl ConfigTokenStore {
    pub fn new(token: TokenInfo, config_path: impl Into<PathBuf>) -> Self {
        Self {
            token: Mutex::new(token),
            config_path: config_path.into(),
        }
    }

    /// Tokens from `[gmail_oauth.tokens]`. Without a recorded expiry the
    /// access token counts as expired and is refreshed on first use.
    pub fn from_config(gmail: &GmailConfig, config_path: impl Into<PathBuf>) -> Self {
        let expires_at = gmail
            .tokens
            .expires_at
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok())
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        Self::new(
            TokenInfo {
                access_token: Some(gmail.tokens.access_token.clone()),
                refresh_token: Some(gmail.tokens.refresh_token.clone()),
                expires_at: Some(expires_at),
                id_token: None,
            },
            config_path,
        )
    }
}

#[async_trait]
impl TokenStorage for ConfigTokenStore {
    async fn set(&self, _scopes: &[&str], mut token: TokenInfo) -> Result<(), TokenStorageError> {
        let mut current = self
            .token
            .lock()
            .map_err(|e| TokenStorageError::Other(e.to_string().into()))?;

        // Refresh responses usually omit the refresh token.
        if token.refresh_token.is_none() {
            token.refresh_token = current.refresh_token.clone();
        }

        if let Some(access_token) = &token.access_token {
            let expires_at = token.expires_at.map(OffsetDateTime::unix_timestamp);
            Config::update_access_token(&self.config_path, access_token, expires_at).map_err(|e| {
                warn!(error = %e, path = %self.config_path.display(), "Cannot persist access token");
                TokenStorageError::Other(e.to_string().into())
            })?;
            info!(path = %self.config_path.display(), "Access token persisted");
        }

        *current = token;
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        self.token.lock().ok().map(|t| t.clone())
    }
}
