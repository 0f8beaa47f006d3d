//! OTP login and logout

use std::sync::Arc;

use crate::credentials::{CredentialStore, Credentials};
use crate::error::{RelayError, Result};
use crate::upstream::AuthApi;

const COUNTRY_PREFIX: &str = "+91";

pub struct LoginFlow {
    store: Arc<CredentialStore>,
    api: Arc<dyn AuthApi>,
}

impl LoginFlow {
    pub fn new(store: Arc<CredentialStore>, api: Arc<dyn AuthApi>) -> Self {
        Self { store, api }
    }

    /// Request an OTP for `number`.
    pub async fn send_otp(&self, number: &str) -> Result<()> {
        let number = normalize_number(number)?;
        self.api.send_otp(&number).await?;
        tracing::info!("OTP sent");
        Ok(())
    }

    /// Complete the login, replacing and persisting the credential record.
    pub async fn verify_otp(&self, number: &str, otp: &str) -> Result<Credentials> {
        let number = normalize_number(number)?;
        let otp = otp.trim();
        if otp.is_empty() {
            return Err(RelayError::Config("OTP must not be empty".to_string()));
        }

        let credentials = self.api.verify_otp(&number, otp).await?;
        self.store.replace(credentials.clone());
        self.store.persist()?;
        tracing::info!("Login successful");
        Ok(credentials)
    }

    /// Forget the session in memory and on disk.
    pub fn logout(&self) -> Result<()> {
        self.store.clear();
        self.store.persist()?;
        tracing::info!("Logged out");
        Ok(())
    }
}

/// Strip spaces and dashes and add the country prefix when missing.
pub fn normalize_number(number: &str) -> Result<String> {
    let cleaned: String = number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(RelayError::Config(format!("invalid mobile number: {:?}", number)));
    }

    if cleaned.starts_with('+') {
        Ok(cleaned)
    } else {
        Ok(format!("{}{}", COUNTRY_PREFIX, cleaned))
    }
}
