//! Token staleness checks
//!
//! Pure functions over a credential snapshot and a point in time. Anything
//! that cannot be interpreted counts as expired so the caller refreshes
//! instead of sending a dead token upstream.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::TokenPolicyConfig;

use super::Credentials;

/// Validity windows for the two token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub access_validity: Duration,
    pub sso_validity: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::from(&TokenPolicyConfig::default())
    }
}

impl From<&TokenPolicyConfig> for ExpiryPolicy {
    fn from(config: &TokenPolicyConfig) -> Self {
        Self {
            access_validity: Duration::from_secs(config.access_token_validity_secs),
            sso_validity: Duration::from_secs(config.sso_token_validity_secs),
        }
    }
}

impl ExpiryPolicy {
    pub fn is_access_token_expired(
        &self,
        credentials: Option<&Credentials>,
        now: DateTime<Utc>,
    ) -> bool {
        match credentials {
            Some(c) => is_stale(
                &c.access_token,
                &c.last_token_refresh_time,
                self.access_validity,
                now,
            ),
            None => true,
        }
    }

    pub fn is_sso_token_expired(&self, credentials: Option<&Credentials>, now: DateTime<Utc>) -> bool {
        match credentials {
            Some(c) => is_stale(
                &c.sso_token,
                &c.last_sso_token_refresh_time,
                self.sso_validity,
                now,
            ),
            None => true,
        }
    }
}

/// Access token check against the default windows and the current time
pub fn is_access_token_expired(credentials: Option<&Credentials>) -> bool {
    ExpiryPolicy::default().is_access_token_expired(credentials, Utc::now())
}

/// SSO token check against the default windows and the current time
pub fn is_sso_token_expired(credentials: Option<&Credentials>) -> bool {
    ExpiryPolicy::default().is_sso_token_expired(credentials, Utc::now())
}

fn is_stale(token: &str, refreshed_at: &str, validity: Duration, now: DateTime<Utc>) -> bool {
    if token.is_empty() {
        return true;
    }

    let Ok(refreshed_at) = refreshed_at.trim().parse::<i64>() else {
        return true;
    };

    let validity = validity.as_secs().min(i64::MAX as u64) as i64;
    match refreshed_at.checked_add(validity) {
        Some(deadline) => now.timestamp() >= deadline,
        None => true,
    }
}
