//! livetv-relay command line

use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livetv_relay::config_file;
use livetv_relay::http::create_router;
use livetv_relay::login::LoginFlow;
use livetv_relay::upstream::UpstreamClient;
use livetv_relay::{AppState, CredentialStore, RelayError, Result, ServerConfig};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "livetv-relay";

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version = VERSION, about = "Live TV relay with token refresh and manifest rewriting")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP relay (default)
    Serve,
    /// Log in with a one-time password sent to your mobile number
    Login,
    /// Remove saved credentials
    Logout,
    /// Write a default configuration file
    GenConfig {
        /// Where to write the file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::GenConfig { path }) = &cli.command {
        config_file::generate_default_config(path)
            .map_err(|e| RelayError::Config(e.to_string()))?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = load_config(&cli.config);
    init_logging(&config.log_level, &config.log_format);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    config.resolve_device_id()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Login => login(config).await,
        Command::Logout => login_flow(&config)?.logout(),
        Command::GenConfig { .. } => Ok(()),
    }
}

/// Load configuration, falling back to defaults when the file is missing or broken
fn load_config(config_path: &str) -> ServerConfig {
    if !std::path::Path::new(config_path).exists() {
        return ServerConfig::default();
    }

    match config_file::ConfigFile::from_file(config_path) {
        Ok(cf) => cf.into_server_config(),
        Err(e) => {
            // Logging is not initialized yet
            eprintln!(
                "Failed to load config file {}: {}. Using defaults.",
                config_path, e
            );
            ServerConfig::default()
        }
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| RelayError::Config(format!("invalid listen address: {}", e)))?;

    // Create application state
    let state = Arc::new(AppState::new(config.clone())?);
    if !state.credentials.is_authenticated() {
        tracing::warn!("Not logged in; only custom channels can be played");
    }

    spawn_refresh_task(state.clone(), config.refresh_check_interval_secs);

    // Build router
    let app = create_router(state);

    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically keep tokens inside their validity windows
fn spawn_refresh_task(state: Arc<AppState>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if !state.credentials.is_authenticated() {
                continue;
            }
            if let Err(e) = state.refresher.ensure_fresh_tokens().await {
                tracing::warn!("Background token refresh failed: {}", e);
            }
        }
    });
}

fn login_flow(config: &ServerConfig) -> Result<LoginFlow> {
    let store = Arc::new(CredentialStore::load(&config.credentials_path)?);
    let client = UpstreamClient::new(config.upstream.clone())?;
    Ok(LoginFlow::new(store, Arc::new(client)))
}

async fn login(config: ServerConfig) -> Result<()> {
    let flow = login_flow(&config)?;

    let number = prompt("Enter your mobile number: +91 ")?;
    flow.send_otp(&number).await?;
    println!("OTP sent to your mobile number");

    let otp = prompt("Enter OTP: ")?;
    flow.verify_otp(&number, &otp).await?;
    println!(
        "Login successful, credentials saved to {}",
        config.credentials_path.display()
    );
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = std::io::stdout();
    stdout.write_all(label.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Initialize logging with tracing
fn init_logging(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("livetv_relay={},tower_http={}", level, level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::try_parse_from([APP_NAME]).unwrap();
        assert_eq!(cli.config, "config.toml");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from([APP_NAME, "--config", "relay.toml", "gen-config", "out.toml"])
            .unwrap();
        assert_eq!(cli.config, "relay.toml");
        assert!(matches!(cli.command, Some(Command::GenConfig { .. })));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config("/nonexistent/relay.toml");
        assert_eq!(config.port, 5001);
    }
}
