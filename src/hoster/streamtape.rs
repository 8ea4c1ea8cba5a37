use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::{Hoster, browser_options, fetch_page, no_stream};
use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{StreamFormat, StreamSource};

/// `getElementById('norobotlink').innerHTML = '//stream' + ('xyzta.pe/get_video?id=..').substring(1).substring(2);`
static LINK_ASSEMBLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"getElementById\(\s*['"]([a-z]*link)['"]\s*\)\.innerHTML\s*=\s*["']([^"']*)["']\s*\+\s*\(?\s*["']([^"']+)["']\s*\)?((?:\s*\.substring\(\s*\d+\s*\))*)"#,
    )
    .unwrap()
});

static SUBSTRING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.substring\(\s*(\d+)\s*\)").unwrap());

/// Several decoy assignments may precede the real one; `norobotlink` is it.
fn pick_assembly(body: &str) -> Option<Captures<'_>> {
    let candidates: Vec<Captures> = LINK_ASSEMBLY.captures_iter(body).collect();
    let position = candidates
        .iter()
        .position(|caps| &caps[1] == "norobotlink")
        .unwrap_or(0);
    candidates.into_iter().nth(position)
}

/// `None` when an offset does not fit in `usize` or the offsets overflow.
fn assemble(prefix: &str, rest: &str, substrings: &str) -> Option<String> {
    let skip = SUBSTRING
        .captures_iter(substrings)
        .try_fold(0usize, |acc, caps| acc.checked_add(caps[1].parse::<usize>().ok()?))?;
    let tail: String = rest.chars().skip(skip).collect();
    let joined = format!("{}{}", prefix, tail);

    let absolute = if let Some(path) = joined.strip_prefix("//") {
        format!("https://{}", path)
    } else if let Some(path) = joined.strip_prefix('/') {
        format!("https://{}", path)
    } else {
        joined
    };

    if absolute.contains("stream=") {
        Some(absolute)
    } else {
        Some(format!("{}&stream=1", absolute))
    }
}

fn find_link(body: &str) -> Option<String> {
    let caps = pick_assembly(body)?;
    assemble(&caps[2], &caps[3], caps.get(4).map_or("", |m| m.as_str()))
}

pub(super) async fn extract(http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
    let referer = format!("https://{}/", Hoster::Streamtape.domain());
    let page = fetch_page(http, url, &browser_options(Some(&referer))).await?;
    let link = find_link(&page.body).ok_or_else(|| no_stream(Hoster::Streamtape, url))?;
    Ok(StreamSource::new(link, StreamFormat::Mp4).with_server(Hoster::Streamtape.display_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockHttp;

    const PAGE: &str = r#"
        <div id="ideoolink" style="display:none;">/streamtape.com/get_video?id=decoy</div>
        <script>
        document.getElementById('ideoolink').innerHTML = "/streamtape.com/get_v" + ''+ ('xcdideo?id=decoy&expires=1&ip=1&token=bad').substring(4);
        document.getElementById('norobotlink').innerHTML = '//streamta' + ('xnftpe.com/get_video?id=9xK2&expires=1700000000&ip=F0&token=Ab-9').substring(1).substring(2);
        </script>
    "#;

    #[test]
    fn test_assemble_applies_offsets() {
        assert_eq!(
            assemble("//streamta", "xnftpe.com/get_video?id=1", ".substring(1).substring(2)").as_deref(),
            Some("https://streamtape.com/get_video?id=1&stream=1")
        );
        assert_eq!(
            assemble("/streamtape.com/get_v", "ideo?id=2", "").as_deref(),
            Some("https://streamtape.com/get_video?id=2&stream=1")
        );
    }

    #[test]
    fn test_overflowing_offsets_are_rejected() {
        let max = usize::MAX;
        let body = format!(
            "document.getElementById('norobotlink').innerHTML = '//streamta' + ('xnftpe.com/get_video?id=1').substring({max}).substring({max});"
        );
        assert_eq!(find_link(&body), None);
        assert_eq!(
            assemble("//streamta", "xnftpe.com/get_video?id=1", ".substring(99999999999999999999999)"),
            None
        );
    }

    #[tokio::test]
    async fn test_garbled_offsets_fail_as_no_stream() {
        let url = "https://streamtape.com/e/bad";
        let max = usize::MAX;
        let body = format!(
            "document.getElementById('norobotlink').innerHTML = '//streamta' + ('xnftpe.com/get_video?id=1').substring({max}).substring(1);"
        );
        let http = MockHttp::new().page(url, &body);
        let err = extract(&http, url).await.unwrap_err();
        assert_eq!(err.category(), "extraction");
    }

    #[test]
    fn test_norobotlink_preferred() {
        assert_eq!(
            find_link(PAGE).as_deref(),
            Some("https://streamtape.com/get_video?id=9xK2&expires=1700000000&ip=F0&token=Ab-9&stream=1")
        );
    }

    #[test]
    fn test_no_assembly() {
        assert_eq!(find_link("<p>Video not found!</p>"), None);
    }

    #[tokio::test]
    async fn test_extract() {
        let url = "https://streamtape.com/e/9xK2";
        let http = MockHttp::new().page(url, PAGE);
        let source = extract(&http, url).await.unwrap();
        assert!(source.url.starts_with("https://streamtape.com/get_video?id=9xK2"));
        assert_eq!(source.format, StreamFormat::Mp4);
        assert_eq!(source.server.as_deref(), Some("Streamtape"));
    }
}
