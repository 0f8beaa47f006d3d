//! Serialized token renewal
//!
//! Each token kind has its own async mutex. A caller that finds a stale
//! token takes the lock, re-reads the store, and only calls upstream if the
//! token is still stale, so callers queued behind an in-flight refresh see
//! its result instead of issuing a second call. That holds for failures too:
//! callers that queued during a failed attempt get the same error back.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{RelayError, Result};
use crate::upstream::AuthApi;

use super::{CredentialStore, Credentials, ExpiryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Access,
    Sso,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Sso => "sso",
        }
    }
}

/// Refresh bookkeeping for one token kind.
#[derive(Default)]
struct RefreshSlot {
    /// Bumped under `last_failure`'s lock each time an upstream attempt ends.
    attempts: AtomicU64,
    last_failure: Mutex<Option<Arc<RelayError>>>,
}

pub struct RefreshManager {
    store: Arc<CredentialStore>,
    api: Arc<dyn AuthApi>,
    policy: ExpiryPolicy,
    access: RefreshSlot,
    sso: RefreshSlot,
}

impl RefreshManager {
    pub fn new(store: Arc<CredentialStore>, api: Arc<dyn AuthApi>, policy: ExpiryPolicy) -> Self {
        Self {
            store,
            api,
            policy,
            access: RefreshSlot::default(),
            sso: RefreshSlot::default(),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Make sure both tokens are inside their validity windows, refreshing
    /// the access token first and then the SSO token as needed.
    ///
    /// Returns the credential snapshot callers should use upstream. Refresh
    /// failures leave the store as it was; callers that waited on a failed
    /// attempt receive it as `RelayError::Shared`.
    pub async fn ensure_fresh_tokens(&self) -> Result<Credentials> {
        self.ensure_fresh(TokenKind::Access).await?;
        self.ensure_fresh(TokenKind::Sso).await?;
        self.store.snapshot().ok_or(RelayError::NotAuthenticated)
    }

    async fn ensure_fresh(&self, kind: TokenKind) -> Result<()> {
        let slot = match kind {
            TokenKind::Access => &self.access,
            TokenKind::Sso => &self.sso,
        };

        let seen = slot.attempts.load(Ordering::Acquire);
        let snapshot = self.store.snapshot().ok_or(RelayError::NotAuthenticated)?;
        if !self.is_expired(kind, &snapshot) {
            return Ok(());
        }

        let mut last_failure = slot.last_failure.lock().await;

        // An attempt ended while we waited: take its outcome
        if slot.attempts.load(Ordering::Acquire) != seen {
            if let Some(err) = last_failure.as_ref() {
                tracing::debug!("{} token refresh already failed: {}", kind.as_str(), err);
                return Err(RelayError::Shared(err.clone()));
            }
        }

        let current = self.store.snapshot().ok_or(RelayError::NotAuthenticated)?;
        if !self.is_expired(kind, &current) {
            tracing::debug!("{} token already refreshed by another caller", kind.as_str());
            return Ok(());
        }

        tracing::info!("Refreshing {} token", kind.as_str());
        let result = match kind {
            TokenKind::Access => self.api.refresh_access_token(&current).await,
            TokenKind::Sso => self.api.refresh_sso_token(&current).await,
        };

        let token = match result {
            Ok(token) => {
                *last_failure = None;
                slot.attempts.fetch_add(1, Ordering::AcqRel);
                token
            }
            Err(e) => {
                tracing::warn!("{} token refresh failed: {}", kind.as_str(), e);
                let err = Arc::new(e);
                *last_failure = Some(err.clone());
                slot.attempts.fetch_add(1, Ordering::AcqRel);
                return Err(RelayError::Shared(err));
            }
        };

        let now = Utc::now().timestamp();
        let stored = match kind {
            TokenKind::Access => self.store.set_access_token(&current.refresh_token, token, now),
            TokenKind::Sso => self.store.set_sso_token(&current.refresh_token, token, now),
        };
        if !stored {
            // Logged out, or logged in again, while the call was in flight
            return Err(RelayError::NotAuthenticated);
        }

        if let Err(e) = self.store.persist() {
            tracing::warn!("Failed to persist refreshed credentials: {}", e);
        }
        tracing::info!("{} token refreshed", kind.as_str());
        Ok(())
    }

    fn is_expired(&self, kind: TokenKind, credentials: &Credentials) -> bool {
        let now = Utc::now();
        match kind {
            TokenKind::Access => self.policy.is_access_token_expired(Some(credentials), now),
            TokenKind::Sso => self.policy.is_sso_token_expired(Some(credentials), now),
        }
    }
}
