//! Custom channel registry
//!
//! Channels listed in a local JSON or YAML file, namespaced with
//! `CUSTOM_CHANNEL_PREFIX` so they never collide with built-in ids.
//! A reload builds a complete new catalog and swaps it in; readers see
//! either the old or the new one.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;

use super::Channel;

pub const CUSTOM_CHANNEL_PREFIX: &str = "cc_";

/// On-disk document: a top-level `channels` list.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CustomChannelsFile {
    #[serde(default)]
    pub channels: Vec<Channel>,
}

#[derive(Debug, Default)]
struct Catalog {
    channels: Vec<Channel>,
    index: HashMap<String, usize>,
}

impl Catalog {
    fn build(entries: Vec<Channel>) -> Self {
        let mut catalog = Catalog::default();
        for mut channel in entries {
            if channel.id.is_empty() {
                tracing::warn!("Skipping custom channel without id: {:?}", channel.name);
                continue;
            }
            channel.id = with_prefix(&channel.id);
            if catalog.index.contains_key(&channel.id) {
                tracing::warn!("Duplicate custom channel id {}, keeping the first", channel.id);
                continue;
            }
            catalog.index.insert(channel.id.clone(), catalog.channels.len());
            catalog.channels.push(channel);
        }
        catalog
    }
}

/// Namespace an id, leaving already-prefixed ids alone.
pub fn with_prefix(id: &str) -> String {
    if id.starts_with(CUSTOM_CHANNEL_PREFIX) {
        id.to_string()
    } else {
        format!("{}{}", CUSTOM_CHANNEL_PREFIX, id)
    }
}

pub fn is_custom_id(id: &str) -> bool {
    id.starts_with(CUSTOM_CHANNEL_PREFIX)
}

/// Parse a channel file; `.yml`/`.yaml` is YAML, anything else JSON.
pub fn parse_file(path: &Path) -> Result<Vec<Channel>> {
    let data = std::fs::read(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"))
        .unwrap_or(false);

    let doc: CustomChannelsFile = if is_yaml {
        serde_yaml::from_slice(&data)?
    } else {
        serde_json::from_slice(&data)?
    };
    Ok(doc.channels)
}

#[derive(Debug, Default)]
pub struct CustomChannelRegistry {
    path: Option<PathBuf>,
    catalog: RwLock<Option<Arc<Catalog>>>,
}

impl CustomChannelRegistry {
    /// Registry for `path`. Nothing is read until `load`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            catalog: RwLock::new(None),
        }
    }

    /// Re-read the source file and replace the whole catalog.
    ///
    /// Read or parse failures leave an empty catalog. Without a configured
    /// file this does nothing.
    pub fn load(&self) {
        let Some(path) = self.path.as_deref() else {
            tracing::debug!("No custom channels file configured");
            return;
        };

        let catalog = match parse_file(path) {
            Ok(entries) => {
                let catalog = Catalog::build(entries);
                tracing::info!(
                    "Loaded {} custom channels from {}",
                    catalog.channels.len(),
                    path.display()
                );
                catalog
            }
            Err(e) => {
                tracing::warn!("Could not load custom channels from {}: {}", path.display(), e);
                Catalog::default()
            }
        };

        *self.catalog.write() = Some(Arc::new(catalog));
    }

    /// Look up a channel by its prefixed id.
    pub fn get_by_id(&self, id: &str) -> Option<Channel> {
        let catalog = self.catalog.read().clone()?;
        catalog
            .index
            .get(id)
            .and_then(|&i| catalog.channels.get(i))
            .cloned()
    }

    /// All channels in file order.
    pub fn all(&self) -> Vec<Channel> {
        match self.catalog.read().as_ref() {
            Some(catalog) => catalog.channels.clone(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.catalog
            .read()
            .as_ref()
            .map(|c| c.channels.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a load has happened (successful or not).
    pub fn is_loaded(&self) -> bool {
        self.catalog.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "channels": [
            {
                "id": "test1",
                "name": "Test Channel 1",
                "url": "https://example.com/test1.m3u8",
                "logo_url": "https://example.com/logo1.png",
                "category": 5,
                "language": 1,
                "is_hd": true
            },
            {
                "id": "cc_test2",
                "name": "Test Channel 2",
                "url": "https://example.com/test2.m3u8",
                "logo_url": "https://example.com/logo2.png",
                "category": 6,
                "language": 6,
                "is_hd": false
            }
        ]
    }"#;

    fn registry_with(name: &str, content: &str) -> (tempfile::TempDir, CustomChannelRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        let registry = CustomChannelRegistry::new(Some(path));
        registry.load();
        (dir, registry)
    }

    #[test]
    fn test_load_json_and_lookup() {
        let (_dir, registry) = registry_with("channels.json", JSON);

        let channel = registry.get_by_id("cc_test1").unwrap();
        assert_eq!(channel.name, "Test Channel 1");
        assert_eq!(channel.url, "https://example.com/test1.m3u8");
        assert!(channel.is_hd);

        assert!(registry.get_by_id("cc_missing").is_none());
        // Unprefixed ids are not in the namespace
        assert!(registry.get_by_id("test1").is_none());
    }

    #[test]
    fn test_prefix_is_idempotent() {
        let (_dir, registry) = registry_with("channels.json", JSON);

        let channel = registry.get_by_id("cc_test2").unwrap();
        assert_eq!(channel.id, "cc_test2");
        assert!(registry.get_by_id("cc_cc_test2").is_none());
        assert_eq!(with_prefix("cc_x"), with_prefix("x"));
    }

    #[test]
    fn test_load_yaml() {
        let yaml = "channels:
  - id: yaml_test
    name: YAML Test Channel
    url: https://example.com/yaml.m3u8
    logo_url: https://example.com/yaml_logo.png
    category: 8
    language: 6
    is_hd: true
";
        let (_dir, registry) = registry_with("test_channels.yml", yaml);

        let channel = registry.get_by_id("cc_yaml_test").unwrap();
        assert_eq!(channel.name, "YAML Test Channel");
        assert_eq!(channel.category, 8);
    }

    #[test]
    fn test_file_order_preserved() {
        let (_dir, registry) = registry_with("channels.json", JSON);
        let ids: Vec<String> = registry.all().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["cc_test1", "cc_test2"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_missing_file_gives_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let registry = CustomChannelRegistry::new(Some(dir.path().join("absent.json")));
        registry.load();

        assert!(registry.is_loaded());
        assert!(registry.is_empty());
        assert!(registry.get_by_id("cc_test1").is_none());
    }

    #[test]
    fn test_bad_reload_clears_previous() {
        let (dir, registry) = registry_with("channels.json", JSON);
        assert_eq!(registry.len(), 2);

        std::fs::write(dir.path().join("channels.json"), "{ not json").unwrap();
        registry.load();
        assert!(registry.is_loaded());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unloaded_lookup() {
        let registry = CustomChannelRegistry::default();
        assert!(registry.get_by_id("cc_test1").is_none());
        assert!(registry.all().is_empty());

        // Unconfigured load is a no-op
        registry.load();
        assert!(!registry.is_loaded());
    }

    #[test]
    fn test_reload_during_reads() {
        let (dir, registry) = registry_with("channels.json", JSON);
        let registry = Arc::new(registry);

        let reader = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let n = registry.all().len();
                    assert!(n == 2 || n == 1, "partial catalog: {}", n);
                }
            })
        };

        let one = r#"{"channels":[{"id":"solo","name":"Solo"}]}"#;
        for i in 0..50 {
            let content = if i % 2 == 0 { one } else { JSON };
            std::fs::write(dir.path().join("channels.tmp"), content).unwrap();
            std::fs::rename(dir.path().join("channels.tmp"), dir.path().join("channels.json")).unwrap();
            registry.load();
        }
        reader.join().unwrap();
    }
}
