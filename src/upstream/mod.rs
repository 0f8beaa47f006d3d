//! Upstream provider access
//!
//! `AuthApi` is the seam between token management and the network; the
//! production implementation is `UpstreamClient`.

pub mod client;
pub mod types;

pub use client::UpstreamClient;

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::error::Result;

/// Token and login calls against the provider's auth service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange the refresh token for a new access token.
    async fn refresh_access_token(&self, credentials: &Credentials) -> Result<String>;

    /// Obtain a new SSO token using the current one.
    async fn refresh_sso_token(&self, credentials: &Credentials) -> Result<String>;

    /// Ask the provider to text a one-time password to `number`.
    async fn send_otp(&self, number: &str) -> Result<()>;

    /// Complete an OTP login, returning a fresh credential record.
    async fn verify_otp(&self, number: &str, otp: &str) -> Result<Credentials>;
}
