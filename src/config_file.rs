//! Configuration file support
//!
//! Loads relay configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{generate_device_id, ServerConfig, TokenPolicyConfig, UpstreamConfig};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Credential and catalog files
    pub storage: StorageSettings,
    /// Upstream provider settings
    pub upstream: Option<UpstreamSettings>,
    /// Token validity settings
    pub tokens: Option<TokenSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
    /// Secret for the URL codec
    pub url_secret: Option<String>,
    /// Token freshness check interval in seconds
    pub refresh_check_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Persisted credentials (JSON)
    pub credentials_path: PathBuf,
    /// Custom channel list (JSON or YAML)
    pub custom_channels_file: Option<PathBuf>,
}

/// Every field is optional; unset fields keep the built-in endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamSettings {
    pub refresh_token_url: Option<String>,
    pub refresh_sso_url: Option<String>,
    pub send_otp_url: Option<String>,
    pub verify_otp_url: Option<String>,
    pub channels_url: Option<String>,
    pub playback_url: Option<String>,
    pub app_name: Option<String>,
    pub device_id: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    /// Access token lifetime in seconds
    pub access_token_validity_secs: Option<u64>,
    /// SSO token lifetime in seconds
    pub sso_token_validity_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 5001,
                cors_enabled: Some(true),
                url_secret: None,
                refresh_check_interval_secs: Some(300),
            },
            storage: StorageSettings {
                credentials_path: PathBuf::from("credentials.json"),
                custom_channels_file: None,
            },
            upstream: Some(UpstreamSettings {
                device_id: Some(generate_device_id()),
                timeout_secs: Some(10),
                ..Default::default()
            }),
            tokens: Some(TokenSettings {
                access_token_validity_secs: Some(6600),
                sso_token_validity_secs: Some(86400),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();

        let upstream = match self.upstream {
            Some(u) => {
                let base = UpstreamConfig::default();
                UpstreamConfig {
                    refresh_token_url: u.refresh_token_url.unwrap_or(base.refresh_token_url),
                    refresh_sso_url: u.refresh_sso_url.unwrap_or(base.refresh_sso_url),
                    send_otp_url: u.send_otp_url.unwrap_or(base.send_otp_url),
                    verify_otp_url: u.verify_otp_url.unwrap_or(base.verify_otp_url),
                    channels_url: u.channels_url.unwrap_or(base.channels_url),
                    playback_url: u.playback_url.unwrap_or(base.playback_url),
                    app_name: u.app_name.unwrap_or(base.app_name),
                    device_id: u.device_id.unwrap_or(base.device_id),
                    user_agent: u.user_agent.unwrap_or(base.user_agent),
                    timeout_secs: u.timeout_secs.unwrap_or(base.timeout_secs),
                }
            }
            None => defaults.upstream,
        };

        let tokens = match self.tokens {
            Some(t) => {
                let base = TokenPolicyConfig::default();
                TokenPolicyConfig {
                    access_token_validity_secs: t
                        .access_token_validity_secs
                        .unwrap_or(base.access_token_validity_secs),
                    sso_token_validity_secs: t
                        .sso_token_validity_secs
                        .unwrap_or(base.sso_token_validity_secs),
                }
            }
            None => defaults.tokens,
        };

        let (log_level, log_format) = match self.logging {
            Some(l) => (l.level, l.format.unwrap_or(defaults.log_format)),
            None => (defaults.log_level, defaults.log_format),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            cors_enabled: self.server.cors_enabled.unwrap_or(true),
            log_level,
            log_format,
            credentials_path: self.storage.credentials_path,
            custom_channels_file: self.storage.custom_channels_file,
            url_secret: self.server.url_secret,
            refresh_check_interval_secs: self
                .server
                .refresh_check_interval_secs
                .unwrap_or(defaults.refresh_check_interval_secs),
            upstream,
            tokens,
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
