//! Manifest reference rewriting
//!
//! Every media reference in an upstream manifest is replaced by a local
//! `/render.<ext>?auth=<token>` URL, where the token is the sealed upstream
//! URL. The per-kind `replace_*` functions do literal first-occurrence
//! replacement; `manifest::rewrite_manifest` walks a whole manifest.

pub mod manifest;

pub use manifest::{find_references, ManifestReference};

use std::fmt;

use crate::error::Result;
use crate::secureurl::UrlCipher;

/// Local endpoint a rewritten reference points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderEndpoint {
    Playlist,
    Segment,
    Audio,
    Key,
}

impl RenderEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            RenderEndpoint::Playlist => "/render.m3u8",
            RenderEndpoint::Segment => "/render.ts",
            RenderEndpoint::Audio => "/render.aac",
            RenderEndpoint::Key => "/render.key",
        }
    }
}

impl fmt::Display for RenderEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Inputs for one rewritten URL.
///
/// The sealed value is `base_url + matched`, followed by `params` when
/// non-empty. Empty `channel_id`/`quality` are treated as absent.
#[derive(Debug, Clone, Copy)]
pub struct EncryptedUrlConfig<'a> {
    pub base_url: &'a str,
    pub matched: &'a str,
    pub params: &'a str,
    pub channel_id: Option<&'a str>,
    pub endpoint: RenderEndpoint,
    pub quality: Option<&'a str>,
}

impl EncryptedUrlConfig<'_> {
    /// The upstream URL that gets sealed into `auth`.
    pub fn plain_url(&self) -> String {
        let mut url =
            String::with_capacity(self.base_url.len() + self.matched.len() + self.params.len() + 1);
        url.push_str(self.base_url);
        url.push_str(self.matched);
        let params = self.params.trim_start_matches(['?', '&']);
        if !params.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(params);
        }
        url
    }
}

/// Build `<endpoint>?auth=<token>[&channel_key_id=<id>][&q=<quality>]`.
pub fn create_encrypted_url(cipher: &UrlCipher, config: &EncryptedUrlConfig<'_>) -> Result<String> {
    let token = cipher.encrypt(&config.plain_url())?;

    let mut url = format!("{}?auth={}", config.endpoint.path(), token);
    if let Some(id) = non_empty(config.channel_id) {
        url.push_str("&channel_key_id=");
        url.push_str(&urlencoding::encode(id));
    }
    if let Some(q) = non_empty(config.quality) {
        url.push_str("&q=");
        url.push_str(&urlencoding::encode(q));
    }
    Ok(url)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Per-manifest context shared by every reference in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteContext<'a> {
    /// Upstream URL the manifest was fetched from; relative references
    /// resolve against it.
    pub base_url: &'a str,
    /// Query string forwarded onto every upstream reference.
    pub params: &'a str,
    pub channel_id: Option<&'a str>,
    pub quality: Option<&'a str>,
}

/// Rewrites manifest references using a process-wide cipher.
#[derive(Debug, Clone)]
pub struct ManifestRewriter {
    cipher: UrlCipher,
}

impl ManifestRewriter {
    pub fn new(cipher: UrlCipher) -> Self {
        Self { cipher }
    }

    pub fn cipher(&self) -> &UrlCipher {
        &self.cipher
    }

    /// Rewrite a sub-playlist reference. Carries channel and quality.
    pub fn replace_m3u8(&self, content: &[u8], matched: &[u8], ctx: &RewriteContext<'_>) -> Vec<u8> {
        self.replace_first(content, matched, RenderEndpoint::Playlist, ctx)
    }

    /// Rewrite a media segment reference. Carries quality but no channel.
    pub fn replace_ts(&self, content: &[u8], matched: &[u8], ctx: &RewriteContext<'_>) -> Vec<u8> {
        self.replace_first(content, matched, RenderEndpoint::Segment, ctx)
    }

    /// Rewrite an audio-only segment reference. Carries quality but no channel.
    pub fn replace_aac(&self, content: &[u8], matched: &[u8], ctx: &RewriteContext<'_>) -> Vec<u8> {
        self.replace_first(content, matched, RenderEndpoint::Audio, ctx)
    }

    /// Rewrite a decryption key reference. Carries the channel only.
    pub fn replace_key(&self, content: &[u8], matched: &[u8], ctx: &RewriteContext<'_>) -> Vec<u8> {
        self.replace_first(content, matched, RenderEndpoint::Key, ctx)
    }

    /// Rewrite every reference of a whole manifest in one pass.
    pub fn rewrite_manifest(&self, content: &str, ctx: &RewriteContext<'_>) -> String {
        manifest::rewrite_manifest(self, content, ctx)
    }

    /// Local URL for one reference, or None when sealing failed.
    pub(crate) fn render_url(
        &self,
        endpoint: RenderEndpoint,
        reference: &str,
        ctx: &RewriteContext<'_>,
    ) -> Option<String> {
        let (channel_id, quality) = match endpoint {
            RenderEndpoint::Playlist => (ctx.channel_id, ctx.quality),
            RenderEndpoint::Segment | RenderEndpoint::Audio => (None, ctx.quality),
            RenderEndpoint::Key => (ctx.channel_id, None),
        };

        let base_url = manifest::base_for(ctx.base_url, reference);
        let config = EncryptedUrlConfig {
            base_url: &base_url,
            matched: reference,
            params: ctx.params,
            channel_id,
            endpoint,
            quality,
        };

        match create_encrypted_url(&self.cipher, &config) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Leaving {} reference as-is: {}", endpoint, e);
                None
            }
        }
    }

    fn replace_first(
        &self,
        content: &[u8],
        matched: &[u8],
        endpoint: RenderEndpoint,
        ctx: &RewriteContext<'_>,
    ) -> Vec<u8> {
        // A sealed URL must decrypt to exactly the bytes it replaced
        let Ok(reference) = std::str::from_utf8(matched) else {
            return content.to_vec();
        };
        let Some(pos) = find_bytes(content, matched) else {
            return content.to_vec();
        };
        let Some(replacement) = self.render_url(endpoint, reference, ctx) else {
            return content.to_vec();
        };

        let mut out = Vec::with_capacity(content.len() - matched.len() + replacement.len());
        out.extend_from_slice(&content[..pos]);
        out.extend_from_slice(replacement.as_bytes());
        out.extend_from_slice(&content[pos + matched.len()..]);
        out
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
