//! Channel catalog
//!
//! Built-in channels come from the upstream catalog; custom channels from
//! an optional local file (see `custom`). Both share the `Channel` shape.

pub mod custom;

pub use custom::{CustomChannelRegistry, CUSTOM_CHANNEL_PREFIX};

use serde::{Deserialize, Serialize};

use crate::upstream::types::UpstreamChannel;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Direct manifest URL. Empty for built-in channels, which are
    /// resolved through the playback API.
    pub url: String,
    pub logo_url: String,
    pub category: i32,
    pub language: i32,
    pub is_hd: bool,
}

impl From<UpstreamChannel> for Channel {
    fn from(c: UpstreamChannel) -> Self {
        Self {
            id: c.channel_id.to_string(),
            name: c.channel_name,
            url: String::new(),
            logo_url: c.logo_url,
            category: c.category_id,
            language: c.language_id,
            is_hd: c.is_hd,
        }
    }
}

const LANGUAGES: &[(i32, &str)] = &[
    (1, "Hindi"),
    (2, "Marathi"),
    (3, "Punjabi"),
    (4, "Urdu"),
    (5, "Bengali"),
    (6, "English"),
    (7, "Malayalam"),
    (8, "Tamil"),
    (9, "Gujarati"),
    (10, "Odia"),
    (11, "Telugu"),
    (12, "Bhojpuri"),
    (13, "Kannada"),
    (14, "Assamese"),
    (15, "Nepali"),
    (16, "French"),
    (18, "Other"),
];

const CATEGORIES: &[(i32, &str)] = &[
    (5, "Entertainment"),
    (6, "Movies"),
    (7, "Kids"),
    (8, "Sports"),
    (9, "Lifestyle"),
    (10, "Infotainment"),
    (12, "News"),
    (13, "Music"),
    (15, "Devotional"),
    (16, "Business"),
    (17, "Educational"),
    (18, "Shopping"),
    (19, "JioDarshan"),
];

pub fn language_name(id: i32) -> Option<&'static str> {
    LANGUAGES.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
}

pub fn category_name(id: i32) -> Option<&'static str> {
    CATEGORIES.iter().find(|(k, _)| *k == id).map(|(_, v)| *v)
}

/// Keep channels matching `language` and `category`; 0 disables a filter.
pub fn filter_channels(channels: &[Channel], language: i32, category: i32) -> Vec<Channel> {
    channels
        .iter()
        .filter(|c| language == 0 || c.language == language)
        .filter(|c| category == 0 || c.category == category)
        .cloned()
        .collect()
}

/// Built-in channels first, then custom ones.
pub fn merge_catalog(built_in: Vec<Channel>, custom: Vec<Channel>) -> Vec<Channel> {
    let mut all = built_in;
    all.extend(custom);
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(id: &str, name: &str, language: i32, category: i32) -> Channel {
        Channel {
            id: id.to_string(),
            name: name.to_string(),
            language,
            category,
            ..Default::default()
        }
    }

    fn mixed() -> Vec<Channel> {
        vec![
            ch("1", "Hindi Entertainment", 1, 5),
            ch("2", "English Movies", 6, 6),
            ch("3", "Hindi Movies", 1, 6),
            ch("4", "English Sports", 6, 8),
            ch("5", "Tamil Entertainment", 8, 5),
        ]
    }

    fn ids(channels: &[Channel]) -> Vec<&str> {
        channels.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_filter_by_language() {
        assert_eq!(ids(&filter_channels(&mixed(), 1, 0)), vec!["1", "3"]);
    }

    #[test]
    fn test_filter_by_category() {
        assert_eq!(ids(&filter_channels(&mixed(), 0, 6)), vec!["2", "3"]);
    }

    #[test]
    fn test_filter_by_both() {
        assert_eq!(ids(&filter_channels(&mixed(), 6, 6)), vec!["2"]);
    }

    #[test]
    fn test_no_filter_returns_all() {
        assert_eq!(filter_channels(&mixed(), 0, 0), mixed());
        assert!(filter_channels(&[], 1, 5).is_empty());
    }

    #[test]
    fn test_lookup_tables() {
        assert_eq!(language_name(1), Some("Hindi"));
        assert_eq!(language_name(6), Some("English"));
        assert_eq!(language_name(8), Some("Tamil"));
        assert_eq!(category_name(5), Some("Entertainment"));
        assert_eq!(category_name(6), Some("Movies"));
        assert_eq!(category_name(8), Some("Sports"));
        assert_eq!(language_name(0), None);
        assert_eq!(category_name(99), None);
    }

    #[test]
    fn test_merge_order() {
        let merged = merge_catalog(
            vec![ch("1", "a", 1, 5)],
            vec![ch("cc_x", "b", 6, 8), ch("cc_y", "c", 6, 8)],
        );
        assert_eq!(ids(&merged), vec!["1", "cc_x", "cc_y"]);
    }

    #[test]
    fn test_from_upstream() {
        let c = Channel::from(UpstreamChannel {
            channel_id: 143,
            channel_name: "News".to_string(),
            logo_url: "News.png".to_string(),
            category_id: 12,
            language_id: 1,
            is_hd: true,
        });
        assert_eq!(c.id, "143");
        assert!(c.url.is_empty());
        assert_eq!(category_name(c.category), Some("News"));
    }
}
