//! Static decoder for `eval(function(p,a,c,k,e,d){...})` packed scripts.
//!
//! The payload is never executed: its base-N word tokens are looked up in
//! the embedded keyword table and substituted back in.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PACKED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\}\s*\(\s*'((?:[^'\\]|\\.)*)'\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*'((?:[^'\\]|\\.)*)'\s*\.split\(\s*'\|'\s*\)",
    )
    .unwrap()
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").unwrap());

const DIGITS: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn decode_base(token: &str, radix: u32) -> Option<usize> {
    if radix < 2 || radix as usize > DIGITS.len() {
        return None;
    }
    let digits = &DIGITS[..radix as usize];
    token.chars().try_fold(0usize, |acc, c| {
        let value = digits.find(c)?;
        acc.checked_mul(radix as usize)?.checked_add(value)
    })
}

fn unpack_captures(caps: &Captures) -> Option<String> {
    let payload = unescape(&caps[1]);
    let radix: u32 = caps[2].parse().ok()?;
    let count: usize = caps[3].parse().ok()?;
    let keywords: Vec<&str> = caps[4].split('|').collect();

    if radix as usize > DIGITS.len() {
        return None;
    }

    let unpacked = WORD.replace_all(&payload, |word: &Captures| {
        let token = &word[0];
        decode_base(token, radix)
            .filter(|index| *index < count)
            .and_then(|index| keywords.get(index))
            .filter(|keyword| !keyword.is_empty())
            .map(|keyword| keyword.to_string())
            .unwrap_or_else(|| token.to_string())
    });
    Some(unpacked.into_owned())
}

/// Decode every packed script in `text`, in document order.
pub fn unpack_all(text: &str) -> Vec<String> {
    PACKED
        .captures_iter(text)
        .filter_map(|caps| unpack_captures(&caps))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpack(text: &str) -> Option<String> {
        unpack_all(text).into_iter().next()
    }

    const PACKED_PLAYER: &str = r#"<script type='text/javascript'>eval(function(p,a,c,k,e,d){while(c--)if(k[c])p=p.replace(new RegExp('\\b'+c.toString(a)+'\\b','g'),k[c]);return p}('3({2:"1://0.4/5.6"})',7,7,'cdn|https|file|setup|example|master|m3u8'.split('|'),0,{}))</script>"#;

    #[test]
    fn test_unpack_player_setup() {
        assert_eq!(
            unpack(PACKED_PLAYER).as_deref(),
            Some(r#"setup({file:"https://cdn.example/master.m3u8"})"#)
        );
    }

    #[test]
    fn test_empty_keyword_keeps_token() {
        let packed = r"}('0 1 2',10,3,'alpha||gamma'.split('|'),0,{}))";
        assert_eq!(unpack(packed).as_deref(), Some("alpha 1 gamma"));
    }

    #[test]
    fn test_base36_and_escapes() {
        // "a" is index 10 in base 36.
        let keywords = "k0|k1|k2|k3|k4|k5|k6|k7|k8|k9|sources";
        let packed = format!(r"}}('a=\'x\'',36,11,'{}'.split('|'),0,{{}}))", keywords);
        assert_eq!(unpack(&packed).as_deref(), Some("sources='x'"));
    }

    #[test]
    fn test_every_script_in_document_order() {
        let page = format!(
            "{}<p>between</p>{}",
            r"}('0',10,1,'first'.split('|'),0,{}))",
            r"}('0',10,1,'second'.split('|'),0,{}))"
        );
        assert_eq!(unpack_all(&page), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_decode_base() {
        assert_eq!(decode_base("z", 36), Some(35));
        assert_eq!(decode_base("10", 62), Some(62));
        assert_eq!(decode_base("Z", 62), Some(61));
        assert_eq!(decode_base("Z", 36), None);
    }

    #[test]
    fn test_not_packed() {
        assert!(unpack("var x = 1;").is_none());
        assert!(unpack_all("nothing").is_empty());
    }
}
