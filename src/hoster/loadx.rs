use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use super::{Hoster, browser_options, fetch_page, no_stream};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::{StreamFormat, StreamSource};

static VIDEO_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""videoSource"\s*:\s*"([^"]+)""#).unwrap());

/// Last non-empty path segment of the landing page, e.g. `/video/<hash>`.
fn video_hash(effective: &str) -> Option<String> {
    let parsed = Url::parse(effective).ok()?;
    parsed
        .path_segments()?
        .rfind(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn player_endpoint(effective: &str, hash: &str) -> Option<String> {
    let origin = markup::origin(effective)?;
    Some(format!(
        "{}/player/index.php?data={}&do=getVideo",
        origin,
        urlencoding::encode(hash)
    ))
}

fn video_source(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("videoSource")?.as_str().map(str::to_string))
        .or_else(|| markup::capture_first(body, &[&VIDEO_SOURCE]).map(|src| src.replace("\\/", "/")))
        .filter(|src| src.starts_with("http"))
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let page = fetch_page(http, url, &browser_options(None)).await?;
    let hash = video_hash(&page.url).ok_or_else(|| no_stream(Hoster::LoadX, url))?;
    let endpoint = player_endpoint(&page.url, &hash).ok_or_else(|| no_stream(Hoster::LoadX, url))?;

    debug!(url, endpoint = %endpoint, "Requesting LoadX video source");
    let options = browser_options(Some(&page.url)).header("X-Requested-With", "XMLHttpRequest");
    let response = http.post(&endpoint, "", &options).await.into_result()?;

    let source = video_source(&response.body).ok_or_else(|| no_stream(Hoster::LoadX, url))?;
    Ok(StreamSource::new(source, StreamFormat::M3u8)
        .with_server(Hoster::LoadX.display_name())
        .forcing_hls())
}
