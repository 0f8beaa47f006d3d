//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - The shared credential store, its refresh manager and login flow
//! - The upstream client
//! - The manifest rewriter and its URL cipher
//! - The custom channel registry
//! - Server configuration

use std::sync::Arc;

use crate::channels::{self, custom, Channel, CustomChannelRegistry};
use crate::config::ServerConfig;
use crate::credentials::{CredentialStore, ExpiryPolicy, RefreshManager};
use crate::error::{RelayError, Result};
use crate::login::LoginFlow;
use crate::rewrite::{ManifestRewriter, RewriteContext};
use crate::secureurl::UrlCipher;
use crate::upstream::{AuthApi, UpstreamClient};

/// A manifest fetched and rewritten for one client request.
#[derive(Debug, Clone)]
pub struct RelayedManifest {
    pub upstream_url: String,
    pub body: String,
}

pub struct AppState {
    pub config: ServerConfig,
    pub credentials: Arc<CredentialStore>,
    pub refresher: RefreshManager,
    pub login: LoginFlow,
    pub upstream: UpstreamClient,
    pub rewriter: ManifestRewriter,
    pub custom_channels: CustomChannelRegistry,
}

impl AppState {
    /// Build the state from configuration: loads persisted credentials and
    /// the custom channel file.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let store = Arc::new(CredentialStore::load(&config.credentials_path)?);
        let upstream = UpstreamClient::new(config.upstream.clone())?;
        let cipher = UrlCipher::from_config(config.url_secret.as_deref())?;
        let api: Arc<dyn AuthApi> = Arc::new(upstream.clone());

        let state = Self::with_parts(config, store, api, upstream, cipher);
        state.custom_channels.load();
        Ok(state)
    }

    /// Assemble from explicit parts.
    pub fn with_parts(
        config: ServerConfig,
        store: Arc<CredentialStore>,
        api: Arc<dyn AuthApi>,
        upstream: UpstreamClient,
        cipher: UrlCipher,
    ) -> Self {
        let policy = ExpiryPolicy::from(&config.tokens);
        let custom_channels = CustomChannelRegistry::new(config.custom_channels_file.clone());

        Self {
            refresher: RefreshManager::new(store.clone(), api.clone(), policy),
            login: LoginFlow::new(store.clone(), api),
            credentials: store,
            upstream,
            rewriter: ManifestRewriter::new(cipher),
            custom_channels,
            config,
        }
    }

    /// Built-in and custom channels, optionally filtered (0 = any).
    pub async fn channel_catalog(&self, language: i32, category: i32) -> Result<Vec<Channel>> {
        let built_in: Vec<Channel> = self
            .upstream
            .fetch_channels()
            .await?
            .into_iter()
            .map(Channel::from)
            .collect();

        let all = channels::merge_catalog(built_in, self.custom_channels.all());
        Ok(channels::filter_channels(&all, language, category))
    }

    /// Resolve, fetch and rewrite the live manifest of a channel.
    pub async fn live_manifest(&self, channel_id: &str, quality: Option<&str>) -> Result<RelayedManifest> {
        let url = if custom::is_custom_id(channel_id) {
            self.custom_channels
                .get_by_id(channel_id)
                .map(|c| c.url)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| RelayError::ChannelNotFound(channel_id.to_string()))?
        } else {
            let credentials = self.refresher.ensure_fresh_tokens().await?;
            self.upstream
                .live_stream_url(channel_id, &credentials, quality)
                .await?
        };

        self.relay_manifest(&url, Some(channel_id), quality).await
    }

    /// Fetch a nested playlist whose URL came back through a `/render.m3u8` token.
    pub async fn render_playlist(
        &self,
        auth: &str,
        channel_id: Option<&str>,
        quality: Option<&str>,
    ) -> Result<RelayedManifest> {
        let url = self.rewriter.cipher().decrypt(auth)?;

        let is_custom = channel_id.map(custom::is_custom_id).unwrap_or(false);
        if !is_custom && self.credentials.is_authenticated() {
            self.refresher.ensure_fresh_tokens().await?;
        }

        self.relay_manifest(&url, channel_id, quality).await
    }

    async fn relay_manifest(
        &self,
        url: &str,
        channel_id: Option<&str>,
        quality: Option<&str>,
    ) -> Result<RelayedManifest> {
        let content = self.upstream.fetch_manifest(url).await?;
        let params = url.split_once('?').map(|(_, q)| q).unwrap_or("");

        let ctx = RewriteContext {
            base_url: url,
            params,
            channel_id,
            quality,
        };
        let body = self.rewriter.rewrite_manifest(&content, &ctx);

        Ok(RelayedManifest {
            upstream_url: url.to_string(),
            body,
        })
    }
}
