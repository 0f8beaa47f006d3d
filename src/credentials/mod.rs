//! Session credentials
//!
//! This module holds the single credential record of the process:
//! - `Credentials`: the token set and its refresh timestamps
//! - `CredentialStore`: shared, lock-protected owner of that record,
//!   persisted as JSON between runs
//! - `expiry`: staleness checks
//! - `refresh`: serialized token renewal

pub mod expiry;
pub mod refresh;

pub use expiry::ExpiryPolicy;
pub use refresh::RefreshManager;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Token set for one authenticated session.
///
/// Timestamps are unix seconds stored as strings, the same shape the
/// persisted file has always used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    #[serde(rename = "ssoToken")]
    pub sso_token: String,
    #[serde(rename = "uniqueId")]
    pub unique_id: String,
    pub crm: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "lastTokenRefreshTime")]
    pub last_token_refresh_time: String,
    #[serde(rename = "lastSSOTokenRefreshTime")]
    pub last_sso_token_refresh_time: String,
}

impl Credentials {
    /// True when no session has ever been established.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.refresh_token.is_empty() && self.sso_token.is_empty()
    }
}

/// Process-wide owner of the credential record.
///
/// Readers get cloned snapshots; every write replaces a token together with
/// its timestamp under one lock acquisition.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credentials>>,
    path: Option<PathBuf>,
}

impl CredentialStore {
    /// In-memory store with nothing persisted
    pub fn new(initial: Option<Credentials>) -> Self {
        Self {
            current: RwLock::new(initial.filter(|c| !c.is_empty())),
            path: None,
        }
    }

    /// Load the record persisted at `path`. A missing or corrupt file means
    /// logged out; the next login or logout replaces it.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let initial = match std::fs::read(&path) {
            Ok(data) => match serde_json::from_slice::<Credentials>(&data) {
                Ok(creds) => Some(creds),
                Err(e) => {
                    tracing::warn!(
                        "Ignoring unreadable credentials at {}: {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No saved credentials at {}", path.display());
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            current: RwLock::new(initial.filter(|c| !c.is_empty())),
            path: Some(path),
        })
    }

    /// Clone of the current record
    pub fn snapshot(&self) -> Option<Credentials> {
        self.current.read().clone()
    }

    /// Check whether a session is present
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replace the whole record (login)
    pub fn replace(&self, credentials: Credentials) {
        *self.current.write() = Some(credentials);
    }

    /// Drop the record (logout)
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    /// Store a new access token and its refresh time together.
    ///
    /// `session` is the refresh token of the record the new token was issued
    /// for. Returns false when there is no session, or a different one.
    pub fn set_access_token(&self, session: &str, token: String, refreshed_at: i64) -> bool {
        let mut guard = self.current.write();
        match guard.as_mut() {
            Some(creds) if creds.refresh_token == session => {
                creds.access_token = token;
                creds.last_token_refresh_time = refreshed_at.to_string();
                true
            }
            _ => false,
        }
    }

    /// Store a new SSO token and its refresh time together.
    ///
    /// `session` is the refresh token of the record the new token was issued
    /// for. Returns false when there is no session, or a different one.
    pub fn set_sso_token(&self, session: &str, token: String, refreshed_at: i64) -> bool {
        let mut guard = self.current.write();
        match guard.as_mut() {
            Some(creds) if creds.refresh_token == session => {
                creds.sso_token = token;
                creds.last_sso_token_refresh_time = refreshed_at.to_string();
                true
            }
            _ => false,
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current record to disk. Without a session the file is removed.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        match self.snapshot() {
            Some(creds) => {
                let data = serde_json::to_vec_pretty(&creds)?;
                let tmp = path.with_extension("json.tmp");
                std::fs::write(&tmp, data)?;
                std::fs::rename(&tmp, path)?;
            }
            None => match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }

        Ok(())
    }
}
