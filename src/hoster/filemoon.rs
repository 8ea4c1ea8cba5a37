use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{Hoster, browser_options, fetch_page, no_stream, unpack};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::{StreamFormat, StreamSource};

static PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"file\s*:\s*["']([^"']+\.m3u8[^"']*)["']"#).unwrap(),
        Regex::new(r#"sources\s*:\s*\[\s*\{\s*file\s*:\s*["']([^"']+)["']"#).unwrap(),
    ]
});

/// Packed payloads first; some mirrors also leave the config in clear.
fn find_master(body: &str) -> Option<String> {
    let patterns: Vec<&Regex> = PATTERNS.iter().collect();
    unpack::unpack_all(body)
        .iter()
        .find_map(|script| markup::capture_first(script, &patterns))
        .or_else(|| markup::capture_first(body, &patterns))
}

fn player_iframe(body: &str, base: &str) -> Option<String> {
    let src = markup::tag_attr(body, "iframe", "src")?;
    markup::absolutize(base, &markup::entities::decode(&src)).filter(|src| src != base)
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let mut page = fetch_page(http, url, &browser_options(None)).await?;

    if find_master(&page.body).is_none() {
        if let Some(frame) = player_iframe(&page.body, &page.url) {
            debug!(url, frame = %frame, "Following Filemoon player frame");
            page = fetch_page(http, &frame, &browser_options(Some(&page.url))).await?;
        }
    }

    let master = find_master(&page.body).ok_or_else(|| no_stream(Hoster::Filemoon, url))?;
    let referer = markup::origin(&page.url).map(|origin| format!("{}/", origin));

    let source = StreamSource::new(master, StreamFormat::M3u8)
        .with_server(Hoster::Filemoon.display_name())
        .forcing_hls();
    Ok(match referer {
        Some(referer) => source.with_header("Referer", referer),
        None => source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockHttp;

    const EMBED: &str = "https://filemoon.sx/e/m00nxyz";
    const FRAME: &str = "https://ghbrisk.com/bkg/m00nxyz";
    const PACKED: &str = r#"<script>eval(function(p,a,c,k,e,d){while(c--)if(k[c])p=p.replace(new RegExp('\\b'+c.toString(a)+'\\b','g'),k[c]);return p}('3({2:"1://0.4/5.6"})',7,7,'cdn|https|file|setup|example|master|m3u8'.split('|'),0,{}))</script>"#;

    #[test]
    fn test_master_from_packed_payload() {
        assert_eq!(find_master(PACKED).as_deref(), Some("https://cdn.example/master.m3u8"));
        assert_eq!(find_master("<p>nothing</p>"), None);
    }

    #[test]
    fn test_player_iframe() {
        let body = format!(r#"<iframe src="{}" allowfullscreen></iframe>"#, FRAME);
        assert_eq!(player_iframe(&body, EMBED).as_deref(), Some(FRAME));
        assert_eq!(player_iframe("<div></div>", EMBED), None);
    }

    #[tokio::test]
    async fn test_extract_through_frame() {
        let http = MockHttp::new()
            .page(EMBED, &format!(r#"<iframe src="{}"></iframe>"#, FRAME))
            .page(FRAME, PACKED);

        let source = extract(&http, EMBED).await.unwrap();
        assert_eq!(source.url, "https://cdn.example/master.m3u8");
        assert_eq!(source.format, StreamFormat::M3u8);
        assert_eq!(source.force_hls, Some(true));
        assert_eq!(source.headers.get("Referer").map(String::as_str), Some("https://ghbrisk.com/"));
        assert_eq!(http.calls(), 2);
    }

    #[tokio::test]
    async fn test_extract_gives_up_after_one_frame() {
        let http = MockHttp::new()
            .page(EMBED, &format!(r#"<iframe src="{}"></iframe>"#, FRAME))
            .page(FRAME, r#"<iframe src="https://elsewhere.example/x"></iframe>"#);
        assert!(extract(&http, EMBED).await.is_err());
        assert_eq!(http.calls(), 2);
    }
}
