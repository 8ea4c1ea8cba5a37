//! Doodstream never exposes the final URL. The page yields a `pass_md5`
//! endpoint and a token; the endpoint returns a base URL and the playable
//! link is assembled client-side from base, random padding, token and the
//! current time.

use regex::Regex;
use std::sync::LazyLock;

use super::{Hoster, browser_options, fetch_page, no_stream};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::{StreamFormat, StreamSource};

const PADDING_LEN: usize = 10;

static DOWNLOAD_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(https?://[^/]+)/d/").unwrap());

static PASS_MD5: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(/pass_md5/[\w-]+/[\w-]+)").unwrap());

static TOKEN: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"[?&]token=([^&"'\s]+)&expiry="#).unwrap(),
        Regex::new(r#"token\s*[:=]\s*["']([A-Za-z0-9]+)["']"#).unwrap(),
    ]
});

fn embed_url(url: &str) -> String {
    DOWNLOAD_PATH.replace(url, "$1/e/").into_owned()
}

fn random_padding() -> String {
    use rand::Rng;
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(PADDING_LEN)
        .map(char::from)
        .collect()
}

fn playable_url(base: &str, padding: &str, token: &str, expiry: i64) -> String {
    format!("{}{}?token={}&expiry={}", base, padding, token, expiry)
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let embed = embed_url(url);
    let page = fetch_page(http, &embed, &browser_options(None)).await?;

    let pass_path = markup::capture_first(&page.body, &[&PASS_MD5]).ok_or_else(|| no_stream(Hoster::Doodstream, url))?;
    let token = markup::capture_first(&page.body, &TOKEN.iter().collect::<Vec<_>>())
        .ok_or_else(|| no_stream(Hoster::Doodstream, url))?;

    // Dood mirrors redirect between domains; the endpoint lives on the final one.
    let origin = markup::origin(&page.url).ok_or_else(|| no_stream(Hoster::Doodstream, url))?;
    let pass_url = format!("{}{}", origin, pass_path);
    let base = fetch_page(http, &pass_url, &browser_options(Some(&page.url))).await?;
    let base = base.body.trim();
    if !base.starts_with("http") {
        return Err(no_stream(Hoster::Doodstream, url));
    }

    let link = playable_url(base, &random_padding(), &token, chrono::Utc::now().timestamp());
    Ok(StreamSource::new(link, StreamFormat::Mp4)
        .with_server(Hoster::Doodstream.display_name())
        .with_header("Referer", format!("{}/", origin))
        .requiring_headers())
}
