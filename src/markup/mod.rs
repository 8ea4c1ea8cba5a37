//! Regex helpers for pulling values out of hoster and catalog markup.
//!
//! Everything here is text matching on purpose; pages are never parsed into
//! a DOM, so malformed markup behaves the same way every time.

pub mod entities;

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Try `patterns` in order; the first non-empty capture group 1 wins.
pub fn capture_first(text: &str, patterns: &[&Regex]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn attr_pattern(tag: &str, attr: &str) -> Option<Regex> {
    Regex::new(&format!(
        r#"(?is)<{}\b[^>]*?\s{}\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
        regex::escape(tag),
        regex::escape(attr)
    ))
    .ok()
}

/// Value of `attr` on the first `<tag>` carrying it.
pub fn tag_attr(html: &str, tag: &str, attr: &str) -> Option<String> {
    all_tag_attrs(html, tag, attr).into_iter().next()
}

/// Values of `attr` on every `<tag>` carrying it, in document order.
pub fn all_tag_attrs(html: &str, tag: &str, attr: &str) -> Vec<String> {
    let Some(pattern) = attr_pattern(tag, attr) else {
        return Vec::new();
    };
    pattern
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse the first JSON object or array assigned to `name` (`name = {...}` or
/// `name: [...]`). Assignments of anything else are skipped.
pub fn json_blob(text: &str, name: &str) -> Option<Value> {
    let assignment = Regex::new(&format!(r"\b{}\s*[=:]\s*", regex::escape(name))).ok()?;
    assignment
        .find_iter(text)
        .find_map(|m| balanced_json(&text[m.end()..]))
}

/// Parse the balanced `{...}` or `[...]` at the start of `rest`.
fn balanced_json(rest: &str) -> Option<Value> {
    let open = rest.chars().next()?;
    let close = match open {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in rest.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return serde_json::from_str(&rest[..=i]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Strip tags, decode entities and collapse whitespace.
pub fn clean_text(html: &str) -> String {
    let decoded = entities::decode(&strip_tags(html));
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Resolve `href` against `base`; protocol-relative links become https.
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}

/// `scheme://host[:port]` of `url`.
pub fn origin(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

pub fn host(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_lowercase)
}
