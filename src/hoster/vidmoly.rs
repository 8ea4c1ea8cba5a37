use regex::Regex;
use std::sync::LazyLock;

use super::{Hoster, browser_options, fetch_page, no_stream, unpack};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::{StreamFormat, StreamSource};

static WATCH_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?://[^/]+)/w/([A-Za-z0-9]+)").unwrap());

static PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"sources\s*:\s*\[\s*\{\s*file\s*:\s*["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"file\s*:\s*["']([^"']+\.m3u8[^"']*)["']"#).unwrap(),
    ]
});

/// `/w/<id>` watch pages carry no player; the embed page does.
fn embed_url(url: &str) -> String {
    match WATCH_PATH.captures(url) {
        Some(caps) => format!("{}/embed-{}.html", &caps[1], &caps[2]),
        None => url.to_string(),
    }
}

fn find_file(body: &str) -> Option<String> {
    let patterns: Vec<&Regex> = PATTERNS.iter().collect();
    markup::capture_first(body, &patterns).or_else(|| {
        unpack::unpack_all(body)
            .iter()
            .find_map(|script| markup::capture_first(script, &patterns))
    })
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let embed = embed_url(url);
    let origin = markup::origin(&embed).unwrap_or_else(|| format!("https://{}", Hoster::Vidmoly.domain()));
    let referer = format!("{}/", origin);

    let page = fetch_page(http, &embed, &browser_options(Some(&referer))).await?;
    let file = find_file(&page.body)
        .and_then(|file| markup::absolutize(&page.url, &file))
        .ok_or_else(|| no_stream(Hoster::Vidmoly, url))?;

    Ok(StreamSource::new(&file, StreamFormat::infer(&file))
        .with_server(Hoster::Vidmoly.display_name())
        .with_header("Referer", referer)
        .with_header("Origin", origin)
        .requiring_headers())
}
