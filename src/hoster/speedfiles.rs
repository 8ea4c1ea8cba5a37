//! SpeedFiles ships the file URL through a layered string obfuscation:
//! base64, case swap, reversal, a hex layer and a character shift.

use regex::Regex;
use std::sync::LazyLock;

use super::{Hoster, browser_options, decode_base64, direct_source, fetch_page, no_stream};
use crate::error::Result;
use crate::http::HttpClient;
use crate::markup;
use crate::models::StreamSource;

static ENCODED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"var\s+_0x\w+\s*=\s*"([^"]+)""#).unwrap());

fn swapcase(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c
            }
        })
        .collect()
}

fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}

fn from_hex_pairs(s: &str) -> Option<String> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()).map(char::from))
        .collect()
}

fn shift_back(s: &str) -> Option<String> {
    s.chars()
        .map(|c| (c as u32).checked_sub(3).and_then(char::from_u32))
        .collect()
}

fn decode_payload(encoded: &str) -> Option<String> {
    let layer = reverse(&swapcase(&decode_base64(encoded)?));
    let hex = reverse(&decode_base64(&layer)?);
    let shifted = shift_back(&from_hex_pairs(&hex)?)?;
    decode_base64(&reverse(&swapcase(&shifted))).filter(|url| url.starts_with("http"))
}

fn find_video_url(body: &str) -> Option<String> {
    markup::capture_first(body, &[&ENCODED])
        .and_then(|encoded| decode_payload(&encoded))
        .or_else(|| markup::tag_attr(body, "source", "src"))
        .or_else(|| markup::tag_attr(body, "video", "src"))
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let page = fetch_page(http, url, &browser_options(None)).await?;
    let video = find_video_url(&page.body).ok_or_else(|| no_stream(Hoster::SpeedFiles, url))?;
    Ok(direct_source(Hoster::SpeedFiles, &video))
}
