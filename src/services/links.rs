use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::services::normalizer::fold_turkish;

lazy_static! {
    /// Redirector links embedding an external id: https://host/vs/tt1234567
    static ref REDIRECTOR: Regex = Regex::new(r"^(https?://[^/?#\s]+)/vs/([A-Za-z0-9_-]+)/?$").unwrap();
}

pub const DEFAULT_REDIRECTOR_TEMPLATE: &str = "{origin}/vs/{id}/master.m3u8";
pub const DEFAULT_MANIFEST_HOST_MARKER: &str = "diziyou";

const GENERIC_MANIFEST: &str = "play.m3u8";
const HIGH_BITRATE_MANIFEST: &str = "1080p.m3u8";

/// Group keywords whose streams go through the stream proxy
const PROXIED_GROUP_KEYWORDS: [&str; 3] = ["dizi", "sinema", "film"];

/// Prefix-style proxy for streams served from one origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamProxy {
    /// Prepended verbatim, e.g. "https://proxy.example/url="
    pub prefix: String,
    /// Only URLs starting with this are proxied
    pub origin: String,
}

/// Rewrites known stream URL shapes into directly playable URLs.
#[derive(Debug, Clone)]
pub struct LinkNormalizer {
    redirector_template: String,
    manifest_host_marker: Option<String>,
    proxy: Option<StreamProxy>,
}

impl Default for LinkNormalizer {
    fn default() -> Self {
        Self {
            redirector_template: DEFAULT_REDIRECTOR_TEMPLATE.to_string(),
            manifest_host_marker: Some(DEFAULT_MANIFEST_HOST_MARKER.to_string()),
            proxy: None,
        }
    }
}

impl LinkNormalizer {
    pub fn new(
        redirector_template: &str,
        manifest_host_marker: Option<String>,
        proxy: Option<StreamProxy>,
    ) -> Self {
        Self {
            redirector_template: redirector_template.to_string(),
            manifest_host_marker: manifest_host_marker
                .map(|m| m.to_ascii_lowercase())
                .filter(|m| !m.is_empty()),
            proxy,
        }
    }

    /// Resolve a stream URL. URLs matching no rule are returned unchanged.
    pub fn normalize_stream_url(&self, url: &str) -> String {
        if let Some(rewritten) = self.rewrite_redirector(url) {
            return rewritten;
        }
        if let Some(rewritten) = self.rewrite_manifest(url) {
            return rewritten;
        }
        url.to_string()
    }

    /// Like [`normalize_stream_url`](Self::normalize_stream_url), then routes
    /// series/movie groups from the proxied origin through the stream proxy.
    pub fn normalize_for_group(&self, url: &str, group_key: &str) -> String {
        let resolved = self.normalize_stream_url(url);

        let Some(proxy) = &self.proxy else {
            return resolved;
        };

        if resolved.starts_with(&proxy.prefix) || !resolved.starts_with(&proxy.origin) {
            return resolved;
        }

        let group = fold_turkish(group_key);
        if PROXIED_GROUP_KEYWORDS.iter().any(|k| group.contains(k)) {
            format!("{}{}", proxy.prefix, resolved)
        } else {
            resolved
        }
    }

    fn rewrite_redirector(&self, url: &str) -> Option<String> {
        let caps = REDIRECTOR.captures(url)?;
        let origin = caps.get(1)?.as_str();
        let id = caps.get(2)?.as_str();

        Some(
            self.redirector_template
                .replace("{origin}", origin)
                .replace("{id}", id),
        )
    }

    fn rewrite_manifest(&self, url: &str) -> Option<String> {
        let marker = self.manifest_host_marker.as_deref()?;
        let parsed = Url::parse(url).ok()?;

        let host = parsed.host_str()?.to_ascii_lowercase();
        if !host.contains(marker) || !parsed.path().ends_with(GENERIC_MANIFEST) {
            return None;
        }

        // Swap only the last segment; port, encoding and query stay byte-for-byte
        let path_end = url.find(['?', '#']).unwrap_or(url.len());
        let (base, tail) = url.split_at(path_end);
        let dir = base.strip_suffix(GENERIC_MANIFEST)?;
        if !dir.ends_with('/') {
            return None;
        }

        Some(format!("{}{}{}", dir, HIGH_BITRATE_MANIFEST, tail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirector_rewritten_with_id() {
        let links = LinkNormalizer::default();
        let out = links.normalize_stream_url("https://provider.example/vs/tt9876543");
        assert_eq!(out, "https://provider.example/vs/tt9876543/master.m3u8");
        assert!(out.contains("tt9876543"));

        // trailing slash form
        assert_eq!(
            links.normalize_stream_url("https://vidmody.com/vs/tt13622970/"),
            "https://vidmody.com/vs/tt13622970/master.m3u8"
        );
    }

    #[test]
    fn test_direct_manifest_passes_through() {
        let links = LinkNormalizer::default();
        let url = "https://cdn.example.com/hls/Show%20Name/index.m3u8?token=a&b=%2F";
        assert_eq!(links.normalize_stream_url(url), url);
    }

    #[test]
    fn test_generic_manifest_rewritten() {
        let links = LinkNormalizer::default();
        assert_eq!(
            links.normalize_stream_url("https://www.diziyou7.com/episodes/123/play.m3u8?t=1"),
            "https://www.diziyou7.com/episodes/123/1080p.m3u8?t=1"
        );
        // other hosts keep their generic manifest
        assert_eq!(
            links.normalize_stream_url("https://other.example/episodes/123/play.m3u8"),
            "https://other.example/episodes/123/play.m3u8"
        );
        // only the exact filename
        assert_eq!(
            links.normalize_stream_url("https://diziyou7.com/x/autoplay.m3u8"),
            "https://diziyou7.com/x/autoplay.m3u8"
        );
    }

    #[test]
    fn test_generic_manifest_keeps_other_bytes() {
        let links = LinkNormalizer::default();
        assert_eq!(
            links.normalize_stream_url("https://www.diziyou7.com:443/Dizi%20Adi/S1/play.m3u8?t=a%2Fb#x"),
            "https://www.diziyou7.com:443/Dizi%20Adi/S1/1080p.m3u8?t=a%2Fb#x"
        );
        assert_eq!(
            links.normalize_stream_url("HTTPS://Storage.DiziYou.co/e/play.m3u8"),
            "HTTPS://Storage.DiziYou.co/e/1080p.m3u8"
        );
    }

    #[test]
    fn test_idempotent_on_rewritten_output() {
        let links = LinkNormalizer::default();
        for url in [
            "https://provider.example/vs/tt9876543",
            "https://diziyou7.com/a/play.m3u8",
        ] {
            let once = links.normalize_stream_url(url);
            assert_eq!(links.normalize_stream_url(&once), once);
        }
    }

    #[test]
    fn test_garbage_passes_through() {
        let links = LinkNormalizer::default();
        for url in ["", "not a url", "rtmp://live/stream", "http://"] {
            assert_eq!(links.normalize_stream_url(url), url);
        }
    }

    #[test]
    fn test_custom_template() {
        let links = LinkNormalizer::new("https://direct.example/{id}.m3u8", None, None);
        assert_eq!(
            links.normalize_stream_url("https://vidmody.com/vs/tt5834410"),
            "https://direct.example/tt5834410.m3u8"
        );
        // manifest rule disabled
        assert_eq!(
            links.normalize_stream_url("https://diziyou7.com/a/play.m3u8"),
            "https://diziyou7.com/a/play.m3u8"
        );
    }

    #[test]
    fn test_group_proxy() {
        let proxy = StreamProxy {
            prefix: "https://proxy.example/url=".to_string(),
            origin: "https://load.origin.example/".to_string(),
        };
        let links = LinkNormalizer::new(DEFAULT_REDIRECTOR_TEMPLATE, None, Some(proxy));
        let url = "https://load.origin.example/movie/1.m3u8";

        assert_eq!(
            links.normalize_for_group(url, "Yerli Diziler"),
            "https://proxy.example/url=https://load.origin.example/movie/1.m3u8"
        );
        assert_eq!(
            links.normalize_for_group(url, "SİNEMA"),
            "https://proxy.example/url=https://load.origin.example/movie/1.m3u8"
        );
        assert_eq!(
            links.normalize_for_group(url, "Aksiyon Filmleri"),
            "https://proxy.example/url=https://load.origin.example/movie/1.m3u8"
        );
        assert_eq!(links.normalize_for_group(url, "Spor"), url);
        assert_eq!(
            links.normalize_for_group("https://elsewhere.example/1.m3u8", "Film"),
            "https://elsewhere.example/1.m3u8"
        );
        // stream URL normalization itself never proxies
        assert_eq!(links.normalize_stream_url(url), url);
    }
}
