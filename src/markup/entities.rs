use regex::{Captures, Regex};
use std::sync::LazyLock;

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});").unwrap());

const NAMED: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("ndash", "–"),
    ("mdash", "—"),
    ("hellip", "…"),
    ("lsquo", "‘"),
    ("rsquo", "’"),
    ("sbquo", "‚"),
    ("ldquo", "“"),
    ("rdquo", "”"),
    ("bdquo", "„"),
    ("laquo", "«"),
    ("raquo", "»"),
    ("auml", "ä"),
    ("ouml", "ö"),
    ("uuml", "ü"),
    ("Auml", "Ä"),
    ("Ouml", "Ö"),
    ("Uuml", "Ü"),
    ("szlig", "ß"),
    ("eacute", "é"),
    ("egrave", "è"),
    ("agrave", "à"),
    ("ccedil", "ç"),
    ("copy", "©"),
    ("reg", "®"),
    ("trade", "™"),
    ("deg", "°"),
    ("middot", "·"),
    ("times", "×"),
];

/// Decode named, decimal and hexadecimal character references.
///
/// Unknown names and invalid code points are left untouched.
pub fn decode(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                NAMED
                    .iter()
                    .find(|(name, _)| *name == body)
                    .map(|(_, value)| value.to_string())
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named() {
        assert_eq!(decode("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode("&quot;Hi&quot;"), "\"Hi\"");
        assert_eq!(decode("M&auml;dchen &szlig;"), "Mädchen ß");
    }

    #[test]
    fn test_numeric() {
        assert_eq!(decode("It&#39;s"), "It's");
        assert_eq!(decode("&#x27;x&#X27;"), "'x'");
        assert_eq!(decode("&#252;ber"), "über");
    }

    #[test]
    fn test_unknown_left_alone() {
        assert_eq!(decode("a &bogus; b"), "a &bogus; b");
        assert_eq!(decode("fish & chips"), "fish & chips");
        assert_eq!(decode("&#xD800;"), "&#xD800;");
    }

    #[test]
    fn test_no_double_decoding() {
        assert_eq!(decode("&amp;lt;"), "&lt;");
    }
}
