//! Opaque URL tokens
//!
//! Upstream URLs are never handed to clients in the clear. `UrlCipher`
//! seals them with AES-256-GCM under a process-wide key and encodes
//! `nonce || ciphertext` as unpadded URL-safe base64, which can sit in a
//! query parameter without escaping.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{RelayError, Result};

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct UrlCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for UrlCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlCipher").finish_non_exhaustive()
    }
}

impl UrlCipher {
    /// Derive the key from a configured secret (SHA-256 of the secret).
    pub fn from_secret(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(RelayError::Config("url_secret must not be empty".to_string()));
        }

        let key = Sha256::digest(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| RelayError::Config(format!("invalid url key: {}", e)))?;
        Ok(Self { cipher })
    }

    /// Fresh random key. Tokens do not survive a restart.
    pub fn random() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Build from the optional configured secret, falling back to a random key.
    pub fn from_config(secret: Option<&str>) -> Result<Self> {
        match secret {
            Some(secret) => Self::from_secret(secret),
            None => {
                tracing::warn!("No url_secret configured, using a random key for this run");
                Ok(Self::random())
            }
        }
    }

    /// Seal `plain` into an opaque token. Each call uses a new nonce.
    pub fn encrypt(&self, plain: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plain.as_bytes())
            .map_err(|e| RelayError::Codec(format!("encrypt: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Recover the plain text of a token produced by `encrypt`.
    pub fn decrypt(&self, token: &str) -> Result<String> {
        let raw = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| RelayError::Codec(format!("bad token encoding: {}", e)))?;
        if raw.len() <= NONCE_LEN {
            return Err(RelayError::Codec("token too short".to_string()));
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| RelayError::Codec("token rejected".to_string()))?;

        String::from_utf8(plain).map_err(|e| RelayError::Codec(e.to_string()))
    }
}
