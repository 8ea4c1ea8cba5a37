use regex::Regex;
use std::sync::LazyLock;

use super::{Hoster, browser_options, fetch_page, no_stream, unpack};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::{StreamFormat, StreamSource};

static SHORT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?://[^/]+)/(?:d|e|f|v)/([A-Za-z0-9]+)").unwrap());

static FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"file\s*:\s*["']([^"']+)["']"#).unwrap());

/// Download and share links all map onto the embed player.
fn embed_url(url: &str) -> String {
    match SHORT_PATH.captures(url) {
        Some(caps) => format!("{}/embed/{}", &caps[1], &caps[2]),
        None => url.to_string(),
    }
}

fn find_file(body: &str) -> Option<String> {
    markup::capture_first(body, &[&FILE]).or_else(|| {
        unpack::unpack_all(body)
            .iter()
            .find_map(|script| markup::capture_first(script, &[&FILE]))
    })
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let embed = embed_url(url);
    let origin = markup::origin(&embed).unwrap_or_else(|| format!("https://{}", Hoster::Luluvdo.domain()));
    let referer = format!("{}/", origin);

    let options = browser_options(Some(&referer)).header("Origin", origin.clone());
    let page = fetch_page(http, &embed, &options).await?;
    let file = find_file(&page.body).ok_or_else(|| no_stream(Hoster::Luluvdo, url))?;

    Ok(StreamSource::new(&file, StreamFormat::infer(&file))
        .with_server(Hoster::Luluvdo.display_name())
        .with_header("Origin", origin)
        .with_header("Referer", referer)
        .requiring_headers())
}
