//! Server configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upstream provider endpoints and client identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Refresh-access-token endpoint (POST)
    pub refresh_token_url: String,

    /// Refresh-SSO-token endpoint (GET)
    pub refresh_sso_url: String,

    /// OTP send endpoint (POST)
    pub send_otp_url: String,

    /// OTP verify endpoint (POST)
    pub verify_otp_url: String,

    /// Built-in channel catalog endpoint (GET)
    pub channels_url: String,

    /// Live playback URL endpoint (POST)
    pub playback_url: String,

    /// Application name sent to the auth API
    pub app_name: String,

    /// Device identifier sent with every token call. Empty means "use the
    /// one persisted next to the credentials".
    pub device_id: String,

    /// User agent for manifest fetches
    pub user_agent: String,

    /// Upper bound for one upstream round trip in seconds
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            refresh_token_url:
                "https://auth.media.jio.com/tokenservice/apis/v1/refreshtoken?langId=6".to_string(),
            refresh_sso_url: "https://tv.media.jio.com/apis/v2.0/loginotp/refresh?langId=6"
                .to_string(),
            send_otp_url: "https://jiotvapi.media.jio.com/userservice/apis/v1/loginotp/send"
                .to_string(),
            verify_otp_url: "https://jiotvapi.media.jio.com/userservice/apis/v1/loginotp/verify"
                .to_string(),
            channels_url: "https://jiotvapi.cdn.jio.com/apis/v3.0/getMobileChannelList/get/?langId=6&os=android&devicetype=phone&usertype=JIO&version=315".to_string(),
            playback_url: "https://jiotvapi.media.jio.com/playback/apis/v1/geturl?langId=6"
                .to_string(),
            app_name: "RJIL_JioTV".to_string(),
            device_id: String::new(),
            user_agent: "plaYtv/7.1.3 (Linux;Android 13) ExoPlayerLib/2.11.7".to_string(),
            timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    /// Get the round-trip bound as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fresh 16 hex digit device identifier
pub fn generate_device_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

/// Read the device id stored at `path`, creating it on first use.
///
/// Tokens minted at login are bound to the device that asked for them, so
/// every later run has to present the same id.
pub fn load_or_create_device_id(path: &Path) -> std::io::Result<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => return Ok(content.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let id = generate_device_id();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &id)?;
    tracing::info!("Created device id at {}", path.display());
    Ok(id)
}

/// Token validity windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPolicyConfig {
    /// Access token lifetime counted from its last refresh
    pub access_token_validity_secs: u64,

    /// SSO token lifetime counted from its last refresh
    pub sso_token_validity_secs: u64,
}

impl Default for TokenPolicyConfig {
    fn default() -> Self {
        Self {
            access_token_validity_secs: 6600, // 1h50m, upstream issues 2h tokens
            sso_token_validity_secs: 86400,   // 24h
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    /// Where the credential record is persisted
    pub credentials_path: PathBuf,

    /// Optional custom channel list (.json, .yml or .yaml)
    pub custom_channels_file: Option<PathBuf>,

    /// Secret the URL codec key is derived from. A random key is used when unset.
    pub url_secret: Option<String>,

    /// How often the background task checks token freshness
    pub refresh_check_interval_secs: u64,

    /// Upstream provider settings
    pub upstream: UpstreamConfig,

    /// Token validity windows
    pub tokens: TokenPolicyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            cors_enabled: true,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            credentials_path: PathBuf::from("credentials.json"),
            custom_channels_file: None,
            url_secret: None,
            refresh_check_interval_secs: 300,
            upstream: UpstreamConfig::default(),
            tokens: TokenPolicyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Where the generated device id is kept
    pub fn device_id_path(&self) -> PathBuf {
        self.credentials_path.with_file_name("device_id")
    }

    /// Fill in an unset device id from `device_id_path`.
    pub fn resolve_device_id(&mut self) -> std::io::Result<()> {
        if self.upstream.device_id.is_empty() {
            self.upstream.device_id = load_or_create_device_id(&self.device_id_path())?;
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
