//! Resolves provider-side indirection links ("/redirect/123", "/go/123")
//! to the hoster URL they point at.
//!
//! One fetch, then four heuristics in fixed order; the first hit wins:
//! effective URL, meta refresh, scripted navigation, hoster iframe.
//! When a page carries several signals the earliest heuristic decides.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::hoster::{browser_options, identify};
use crate::http::HttpClient;
use crate::markup;

static REDIRECT_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^/]+(?:/[^?#]*)?/(?:redirect|go)/\d+(?:[/?#]|$)").unwrap());

static META_REFRESH: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"(?is)<meta[^>]+http-equiv\s*=\s*["']?refresh["']?[^>]*content\s*=\s*["']\s*\d*\s*;?\s*url\s*=\s*['"]?([^"'>\s]+)"#).unwrap(),
        Regex::new(r#"(?is)<meta[^>]+content\s*=\s*["']\s*\d*\s*;?\s*url\s*=\s*['"]?([^"'>\s]+)[^>]*http-equiv\s*=\s*["']?refresh"#).unwrap(),
    ]
});

static SCRIPT_NAVIGATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"(?:window|document|top|self)\.location(?:\.href)?\s*=\s*["']((?:https?:)?//[^"']+)["']"#).unwrap(),
        Regex::new(r#"(?:window\.|document\.)?location\.(?:replace|assign)\(\s*["']((?:https?:)?//[^"']+)["']"#).unwrap(),
    ]
});

pub fn is_redirect_shape(url: &str) -> bool {
    REDIRECT_SHAPE.is_match(url.trim())
}

/// Heuristic 1: the fetch landed somewhere else that is not another indirection.
pub fn from_effective_url(input: &str, effective: &str) -> Option<String> {
    let effective = effective.trim();
    if effective.is_empty() || effective == input.trim() || is_redirect_shape(effective) {
        return None;
    }
    Some(effective.to_string())
}

/// Heuristic 2: `<meta http-equiv="refresh" content="0; url=...">`.
pub fn meta_refresh_target(body: &str, base: &str) -> Option<String> {
    let target = markup::capture_first(body, &META_REFRESH.iter().collect::<Vec<_>>())?;
    markup::absolutize(base, &markup::entities::decode(&target))
}

/// Heuristic 3: `window.location = "..."` and friends.
pub fn script_navigation_target(body: &str) -> Option<String> {
    let target = markup::capture_first(body, &SCRIPT_NAVIGATION.iter().collect::<Vec<_>>())?;
    markup::absolutize("https://localhost/", &target)
}

/// Heuristic 4: the first iframe whose src belongs to a known hoster.
pub fn hoster_iframe(body: &str) -> Option<String> {
    markup::all_tag_attrs(body, "iframe", "src")
        .into_iter()
        .filter_map(|src| markup::absolutize("https://localhost/", &markup::entities::decode(&src)))
        .find(|src| identify(src).is_some())
}

/// Resolve `url` to a concrete hoster URL.
///
/// URLs that are not an indirection shape come back unchanged without a
/// fetch. `None` means every heuristic came up empty.
pub async fn resolve(http: &dyn HttpClient, url: &str) -> Option<String> {
    if !is_redirect_shape(url) {
        return Some(url.to_string());
    }

    let response = http.get(url, &browser_options(None)).await;
    if response.status == 0 {
        debug!(url, error = ?response.error, "Redirect fetch failed");
    }

    let resolved = from_effective_url(url, &response.url)
        .or_else(|| meta_refresh_target(&response.body, &response.url))
        .or_else(|| script_navigation_target(&response.body))
        .or_else(|| hoster_iframe(&response.body));

    match &resolved {
        Some(target) => debug!(url, target = %target, "Resolved redirect"),
        None => debug!(url, status = response.status, "Redirect unresolved"),
    }
    resolved
}
