//! Bearer-token lifecycle
//!
//! The access token is obtained out of band (OAuth redirect handled by the
//! browser or a helper), persisted as JSON in the root folder, and cleared when
//! it expires or the catalog rejects it.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Token file name inside the root folder
pub const TOKEN_FILE_NAME: &str = "token.json";

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Catalog access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// Build a token from an authorization response (`expires_in` seconds from now)
    pub fn obtain(access_token: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
        }
    }

    /// Present, non-blank and not within the expiry margin at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.trim().is_empty()
            && now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// File-backed holder of the current token
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    current: RwLock<Option<AuthToken>>,
}

impl TokenStore {
    /// Create a store persisting to `<root_folder>/token.json`
    ///
    /// Nothing is read until [`TokenStore::load`] is called.
    pub fn new(root_folder: &Path) -> Self {
        Self {
            path: root_folder.join(TOKEN_FILE_NAME),
            current: RwLock::new(None),
        }
    }

    /// In-memory store that never touches disk until persisted
    pub fn with_token(root_folder: &Path, token: AuthToken) -> Self {
        Self {
            path: root_folder.join(TOKEN_FILE_NAME),
            current: RwLock::new(Some(token)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted token
    ///
    /// An expired token on disk is cleared and `None` returned.
    pub fn load(&self) -> Result<Option<AuthToken>> {
        if !self.path.exists() {
            debug!("No persisted token at {}", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let token: AuthToken = serde_json::from_str(&content)
            .map_err(|e| Error::Parse(format!("Token file: {}", e)))?;

        if !token.is_valid() {
            info!("Persisted token expired at {}, clearing", token.expires_at);
            self.clear()?;
            return Ok(None);
        }

        *self.write_guard() = Some(token.clone());
        Ok(Some(token))
    }

    /// Install a freshly obtained token and persist it
    pub fn obtain(&self, token: AuthToken) -> Result<()> {
        *self.write_guard() = Some(token);
        self.persist()
    }

    /// Write the current token to disk (no-op without a token)
    pub fn persist(&self) -> Result<()> {
        let Some(token) = self.current() else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&token)
            .map_err(|e| Error::Parse(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        debug!("Token persisted to {}", self.path.display());
        Ok(())
    }

    /// Current token, valid or not
    pub fn current(&self) -> Option<AuthToken> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether a valid token is present
    pub fn has_valid_token(&self) -> bool {
        self.current().is_some_and(|t| t.is_valid())
    }

    /// Access token for an `Authorization: Bearer` header
    pub fn bearer(&self) -> Result<String> {
        match self.current() {
            Some(token) if token.is_valid() => Ok(token.access_token),
            Some(_) => Err(Error::Auth("access token expired".to_string())),
            None => Err(Error::Auth("no access token".to_string())),
        }
    }

    /// Drop the token after the catalog rejected it
    pub fn expire(&self) {
        warn!("Access token rejected by catalog, expiring");
        if let Err(e) = self.clear() {
            warn!("Failed to remove token file: {}", e);
        }
    }

    /// Forget the token in memory and on disk
    pub fn clear(&self) -> Result<()> {
        *self.write_guard() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, Option<AuthToken>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }
}
