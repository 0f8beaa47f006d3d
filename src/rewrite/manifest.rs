//! Whole-manifest reference discovery and rewriting
//!
//! Manifests are walked line by line. A non-tag line is a URI; a tag line
//! may carry one in its `URI="..."` attribute. Nothing else is parsed, so
//! tags, attributes and line endings come out exactly as they went in.

use std::ops::Range;

use super::{ManifestRewriter, RenderEndpoint, RewriteContext};

macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// One media reference found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReference<'a> {
    pub endpoint: RenderEndpoint,
    pub uri: &'a str,
    /// Byte range of `uri` within the manifest.
    pub range: Range<usize>,
}

/// Find every rewritable reference, in manifest order.
pub fn find_references(content: &str) -> Vec<ManifestReference<'_>> {
    let mut refs = Vec::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let trimmed = body.trim_start();
        let start = offset + (body.len() - trimmed.len());
        let trimmed = trimmed.trim_end();
        offset += line.len();

        if trimmed.is_empty() {
            continue;
        }

        if !trimmed.starts_with('#') {
            refs.push(ManifestReference {
                endpoint: classify_uri(trimmed),
                uri: trimmed,
                range: start..start + trimmed.len(),
            });
            continue;
        }

        let Some(endpoint) = classify_tag(trimmed) else {
            continue;
        };
        if let Some(m) = regex!(r#"URI="([^"]+)""#)
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
        {
            refs.push(ManifestReference {
                endpoint,
                uri: m.as_str(),
                range: start + m.start()..start + m.end(),
            });
        }
    }

    refs
}

fn classify_uri(uri: &str) -> RenderEndpoint {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    if path.ends_with(".m3u8") {
        RenderEndpoint::Playlist
    } else if path.ends_with(".aac") {
        RenderEndpoint::Audio
    } else {
        RenderEndpoint::Segment
    }
}

fn classify_tag(line: &str) -> Option<RenderEndpoint> {
    let name = line.split(':').next().unwrap_or(line);
    match name {
        "#EXT-X-KEY" | "#EXT-X-SESSION-KEY" => Some(RenderEndpoint::Key),
        "#EXT-X-MEDIA" | "#EXT-X-I-FRAME-STREAM-INF" => Some(RenderEndpoint::Playlist),
        "#EXT-X-MAP" => Some(RenderEndpoint::Segment),
        _ => None,
    }
}

/// Prefix that turns `reference` into an absolute URL when prepended.
///
/// Absolute references need none. Origin-relative ones get the scheme and
/// host of `base_url`; everything else gets its directory.
pub(crate) fn base_for(base_url: &str, reference: &str) -> String {
    if base_url.is_empty() || is_absolute(reference) {
        return String::new();
    }

    let base = base_url.split(['?', '#']).next().unwrap_or(base_url);
    let Some(scheme_end) = base.find("://") else {
        return String::new();
    };
    let authority_start = scheme_end + 3;

    if reference.starts_with("//") {
        return base[..scheme_end + 1].to_string();
    }

    let path_start = base[authority_start..]
        .find('/')
        .map(|i| authority_start + i);

    if reference.starts_with('/') {
        return base[..path_start.unwrap_or(base.len())].to_string();
    }

    match path_start {
        Some(_) => match base.rfind('/') {
            Some(i) => base[..=i].to_string(),
            None => String::new(),
        },
        None => format!("{}/", base),
    }
}

fn is_absolute(reference: &str) -> bool {
    match reference.find("://") {
        Some(i) => {
            i > 0
                && reference[..i]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

pub(crate) fn rewrite_manifest(
    rewriter: &ManifestRewriter,
    content: &str,
    ctx: &RewriteContext<'_>,
) -> String {
    let refs = find_references(content);
    let mut out = String::with_capacity(content.len() + refs.len() * 128);
    let mut last = 0;

    for r in &refs {
        out.push_str(&content[last..r.range.start]);
        match rewriter.render_url(r.endpoint, r.uri, ctx) {
            Some(url) => out.push_str(&url),
            None => out.push_str(r.uri),
        }
        last = r.range.end;
    }
    out.push_str(&content[last..]);

    tracing::debug!("Rewrote {} manifest references", refs.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secureurl::UrlCipher;

    const MASTER: &str = "#EXTM3U\n\
#EXT-X-VERSION:3\n\
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"Hindi\",URI=\"audio/hin.m3u8\"\n\
#EXT-X-STREAM-INF:BANDWIDTH=400000,RESOLUTION=640x360\n\
News_400.m3u8?minrate=1\n\
#EXT-X-STREAM-INF:BANDWIDTH=1200000,RESOLUTION=1280x720\n\
https://other.cdn.test/News_1200.m3u8\n";

    const MEDIA: &str = "#EXTM3U\r\n\
#EXT-X-TARGETDURATION:6\r\n\
#EXT-X-MEDIA-SEQUENCE:1021\r\n\
#EXT-X-KEY:METHOD=AES-128,URI=\"https://tv.media.test/key?id=1\",IV=0x00\r\n\
#EXT-X-MAP:URI=\"/bpk-tv/News/init.mp4\"\r\n\
#EXTINF:6.000,\r\n\
News-1021.ts\r\n\
#EXTINF:6.000,\r\n\
News-1022.aac\r\n";

    fn rewriter() -> ManifestRewriter {
        ManifestRewriter::new(UrlCipher::from_secret("manifest-tests").unwrap())
    }

    fn auth_of(url: &str) -> &str {
        let start = url.find("auth=").unwrap() + 5;
        url[start..].split(['&', '"']).next().unwrap()
    }

    #[test]
    fn test_find_references_master() {
        let refs = find_references(MASTER);
        let found: Vec<(RenderEndpoint, &str)> = refs.iter().map(|r| (r.endpoint, r.uri)).collect();
        assert_eq!(
            found,
            vec![
                (RenderEndpoint::Playlist, "audio/hin.m3u8"),
                (RenderEndpoint::Playlist, "News_400.m3u8?minrate=1"),
                (RenderEndpoint::Playlist, "https://other.cdn.test/News_1200.m3u8"),
            ]
        );
        for r in &refs {
            assert_eq!(&MASTER[r.range.clone()], r.uri);
        }
    }

    #[test]
    fn test_find_references_media() {
        let refs = find_references(MEDIA);
        let kinds: Vec<RenderEndpoint> = refs.iter().map(|r| r.endpoint).collect();
        assert_eq!(
            kinds,
            vec![
                RenderEndpoint::Key,
                RenderEndpoint::Segment,
                RenderEndpoint::Segment,
                RenderEndpoint::Audio,
            ]
        );
        // CRLF is not part of the URI
        assert_eq!(refs[2].uri, "News-1021.ts");
        assert_eq!(refs[3].uri, "News-1022.aac");
    }

    #[test]
    fn test_base_for() {
        let base = "https://cdn.test/bpk-tv/News/master.m3u8?hdnea=x";
        assert_eq!(base_for(base, "News_400.m3u8"), "https://cdn.test/bpk-tv/News/");
        assert_eq!(base_for(base, "/keys/1"), "https://cdn.test");
        assert_eq!(base_for(base, "//edge.test/a.ts"), "https:");
        assert_eq!(base_for(base, "http://x.test/a.ts"), "");
        assert_eq!(base_for("https://cdn.test", "a.ts"), "https://cdn.test/");
        assert_eq!(base_for("", "a.ts"), "");
        assert_eq!(base_for("not a url", "a.ts"), "");
    }

    #[test]
    fn test_rewrite_master_preserves_structure() {
        let rw = rewriter();
        let ctx = RewriteContext {
            base_url: "https://cdn.test/bpk-tv/News/master.m3u8",
            params: "hdnea=tok",
            channel_id: Some("143"),
            quality: Some("auto"),
        };
        let out = rw.rewrite_manifest(MASTER, &ctx);

        let before: Vec<&str> = MASTER.lines().collect();
        let after: Vec<&str> = out.lines().collect();
        assert_eq!(before.len(), after.len());
        assert_eq!(after[0], "#EXTM3U");
        assert_eq!(after[3], before[3]);
        assert!(after[2].starts_with("#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"aac\",NAME=\"Hindi\",URI=\"/render.m3u8?auth="));
        assert!(after[2].ends_with("&channel_key_id=143&q=auto\""));
        assert!(after[4].starts_with("/render.m3u8?auth="));

        assert_eq!(
            rw.cipher().decrypt(auth_of(after[2])).unwrap(),
            "https://cdn.test/bpk-tv/News/audio/hin.m3u8?hdnea=tok"
        );
        assert_eq!(
            rw.cipher().decrypt(auth_of(after[4])).unwrap(),
            "https://cdn.test/bpk-tv/News/News_400.m3u8?minrate=1&hdnea=tok"
        );
        assert_eq!(
            rw.cipher().decrypt(auth_of(after[6])).unwrap(),
            "https://other.cdn.test/News_1200.m3u8?hdnea=tok"
        );
        assert_eq!(out.matches("/render.").count(), 3);
    }

    #[test]
    fn test_rewrite_media_playlist() {
        let rw = rewriter();
        let ctx = RewriteContext {
            base_url: "https://cdn.test/bpk-tv/News/News_400.m3u8",
            params: "",
            channel_id: Some("143"),
            quality: None,
        };
        let out = rw.rewrite_manifest(MEDIA, &ctx);

        assert!(out.ends_with("\r\n"));
        assert_eq!(out.matches("\r\n").count(), MEDIA.matches("\r\n").count());

        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[3].starts_with("#EXT-X-KEY:METHOD=AES-128,URI=\"/render.key?auth="));
        assert!(lines[3].contains("&channel_key_id=143\",IV=0x00"));
        assert!(lines[4].starts_with("#EXT-X-MAP:URI=\"/render.ts?auth="));
        assert!(lines[6].starts_with("/render.ts?auth="));
        assert!(!lines[6].contains("channel_key_id"));
        assert!(lines[8].starts_with("/render.aac?auth="));

        assert_eq!(
            rw.cipher().decrypt(auth_of(lines[4])).unwrap(),
            "https://cdn.test/bpk-tv/News/init.mp4"
        );
        assert_eq!(
            rw.cipher().decrypt(auth_of(lines[6])).unwrap(),
            "https://cdn.test/bpk-tv/News/News-1021.ts"
        );
    }

    #[test]
    fn test_rewrite_without_references() {
        let content = "#EXTM3U\n#EXT-X-ENDLIST\n";
        assert_eq!(rewriter().rewrite_manifest(content, &RewriteContext::default()), content);
        assert_eq!(rewriter().rewrite_manifest("", &RewriteContext::default()), "");
    }
}
