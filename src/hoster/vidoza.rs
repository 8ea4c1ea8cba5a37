use regex::Regex;
use std::sync::LazyLock;

use super::{Hoster, browser_options, direct_source, fetch_page, no_stream};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::StreamSource;

static SOURCES_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"sourcesCode\s*:\s*\[\s*\{\s*src\s*:\s*["']([^"']+)["']"#).unwrap());

/// `<video src>`, then the first `<source src>`, then the player config.
fn find_video_url(html: &str) -> Option<String> {
    markup::tag_attr(html, "video", "src")
        .or_else(|| markup::tag_attr(html, "source", "src"))
        .or_else(|| markup::capture_first(html, &[&SOURCES_CODE]))
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let page = fetch_page(http, url, &browser_options(None)).await?;
    let video = find_video_url(&page.body)
        .and_then(|src| markup::absolutize(&page.url, &markup::entities::decode(&src)))
        .ok_or_else(|| no_stream(Hoster::Vidoza, url))?;
    Ok(direct_source(Hoster::Vidoza, &video))
}
