//! Live TV relay
//!
//! Keeps an upstream IPTV session alive and serves its channels through
//! rewritten HLS manifests whose media URLs are sealed into opaque tokens.

pub mod channels;
pub mod config;
pub mod config_file;
pub mod credentials;
pub mod error;
pub mod http;
pub mod login;
pub mod rewrite;
pub mod secureurl;
pub mod state;
pub mod upstream;

pub use config::ServerConfig;
pub use credentials::{CredentialStore, Credentials, ExpiryPolicy, RefreshManager};
pub use error::{RelayError, Result};
pub use rewrite::{create_encrypted_url, EncryptedUrlConfig, ManifestRewriter, RenderEndpoint};
pub use secureurl::UrlCipher;
pub use state::AppState;
