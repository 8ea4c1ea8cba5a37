//! VOE hides the real player behind a scripted hop to a second page, and
//! that page carries the HLS master URL base64-encoded.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{Hoster, browser_options, decode_base64, fetch_page, no_stream};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::{StreamFormat, StreamSource};

static NAVIGATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"window\.location\.href\s*=\s*["']([^"']+)["']"#).unwrap());

static ENCODED_HLS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'hls'\s*:\s*'([^']+)'").unwrap());

static PLAIN_HLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']hls["']\s*:\s*["'](https?://[^"']+)["']"#).unwrap());

/// Target of the scripted hop, if the page has one.
fn secondary_page(body: &str, base: &str) -> Option<String> {
    let target = markup::capture_first(body, &[&NAVIGATION])?;
    markup::absolutize(base, &target)
}

/// A field value that is either a plain URL or base64 of one.
fn decode_hls_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    decode_base64(value).filter(|url| url.starts_with("http"))
}

fn find_hls(body: &str) -> Option<String> {
    markup::capture_first(body, &[&ENCODED_HLS])
        .and_then(|value| decode_hls_value(&value))
        .or_else(|| markup::capture_first(body, &[&PLAIN_HLS]))
        .or_else(|| {
            let sources = markup::json_blob(body, "sources")?;
            decode_hls_value(sources.get("hls")?.as_str()?)
        })
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let mut page = fetch_page(http, url, &browser_options(None)).await?;

    if find_hls(&page.body).is_none() {
        if let Some(next) = secondary_page(&page.body, &page.url) {
            debug!(url, next = %next, "Following VOE navigation");
            page = fetch_page(http, &next, &browser_options(Some(&page.url))).await?;
        }
    }

    let hls = find_hls(&page.body).ok_or_else(|| no_stream(Hoster::Voe, url))?;
    Ok(StreamSource::new(hls, StreamFormat::M3u8).with_server(Hoster::Voe.display_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockHttp;

    const EMBED: &str = "https://voe.sx/e/k3jd82hs";
    const PLAYER: &str = "https://jilliandescribecompany.com/e/k3jd82hs";
    // base64 of https://delivery-node-7.voe-network.net/engine/hls2/01/k3jd82hs/master.m3u8
    const ENCODED: &str = "aHR0cHM6Ly9kZWxpdmVyeS1ub2RlLTcudm9lLW5ldHdvcmsubmV0L2VuZ2luZS9obHMyLzAxL2szamQ4MmhzL21hc3Rlci5tM3U4";
    const MASTER: &str = "https://delivery-node-7.voe-network.net/engine/hls2/01/k3jd82hs/master.m3u8";

    #[test]
    fn test_navigation_target() {
        let body = format!("<script>if (true) {{ window.location.href = '{}'; }}</script>", PLAYER);
        assert_eq!(secondary_page(&body, EMBED).as_deref(), Some(PLAYER));
        assert_eq!(secondary_page("<html></html>", EMBED), None);
    }

    #[test]
    fn test_encoded_hls_field() {
        let body = format!("var sources = {{ 'hls': '{}', 'video_height': 1080 }};", ENCODED);
        assert_eq!(find_hls(&body).as_deref(), Some(MASTER));
    }

    #[test]
    fn test_plain_hls_field() {
        let body = format!(r#"let cfg = {{"hls": "{}"}};"#, MASTER);
        assert_eq!(find_hls(&body).as_deref(), Some(MASTER));
    }

    #[test]
    fn test_garbage_field_is_rejected() {
        assert_eq!(decode_hls_value("bm90IGEgdXJs"), None);
        assert_eq!(find_hls("'hls': '!!!'"), None);
    }

    #[tokio::test]
    async fn test_extract_follows_hop() {
        let http = MockHttp::new()
            .page(EMBED, &format!("<script>window.location.href = '{}';</script>", PLAYER))
            .page(PLAYER, &format!("var sources = {{ 'hls': '{}' }};", ENCODED));

        let source = extract(&http, EMBED).await.unwrap();
        assert_eq!(source.url, MASTER);
        assert_eq!(source.format, StreamFormat::M3u8);
        assert_eq!(http.calls(), 2);
        assert_eq!(
            http.requests()[1].headers.get("Referer").map(String::as_str),
            Some(EMBED)
        );
    }

    #[tokio::test]
    async fn test_extract_single_page() {
        let http = MockHttp::new().page(EMBED, &format!("'hls': '{}'", ENCODED));
        assert_eq!(extract(&http, EMBED).await.unwrap().url, MASTER);
        assert_eq!(http.calls(), 1);
    }
}
