//! Hoster identification and per-hoster stream extraction.
//!
//! [`identify`] walks the registry in declaration order and the first
//! domain pattern that matches wins. Patterns anchor on the URL authority
//! so no two hosters can claim the same URL.

mod doodstream;
mod filemoon;
mod loadx;
mod luluvdo;
pub mod redirect;
mod speedfiles;
mod streamtape;
pub mod unpack;
mod vidmoly;
mod vidoza;
mod voe;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::config::BROWSER_USER_AGENT;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpResponse, RequestOptions};
use crate::markup;
use crate::models::{HosterInfo, StreamFormat, StreamSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hoster {
    Vidoza,
    Vidmoly,
    Voe,
    Streamtape,
    SpeedFiles,
    Luluvdo,
    LoadX,
    Filemoon,
    Doodstream,
}

fn authority_pattern(domains: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)^(?:https?:)?//(?:[a-z0-9-]+\.)*(?:{})(?::\d+)?(?:[/?#]|$)",
        domains
    ))
    .unwrap()
}

static REGISTRY: LazyLock<Vec<(Hoster, Regex)>> = LazyLock::new(|| {
    Hoster::ALL
        .iter()
        .map(|h| (*h, authority_pattern(h.domain_pattern())))
        .collect()
});

impl Hoster {
    /// Registry declaration order.
    pub const ALL: [Hoster; 9] = [
        Hoster::Vidoza,
        Hoster::Vidmoly,
        Hoster::Voe,
        Hoster::Streamtape,
        Hoster::SpeedFiles,
        Hoster::Luluvdo,
        Hoster::LoadX,
        Hoster::Filemoon,
        Hoster::Doodstream,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Hoster::Vidoza => "vidoza",
            Hoster::Vidmoly => "vidmoly",
            Hoster::Voe => "voe",
            Hoster::Streamtape => "streamtape",
            Hoster::SpeedFiles => "speedfiles",
            Hoster::Luluvdo => "luluvdo",
            Hoster::LoadX => "loadx",
            Hoster::Filemoon => "filemoon",
            Hoster::Doodstream => "doodstream",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Hoster::Vidoza => "Vidoza",
            Hoster::Vidmoly => "Vidmoly",
            Hoster::Voe => "VOE",
            Hoster::Streamtape => "Streamtape",
            Hoster::SpeedFiles => "SpeedFiles",
            Hoster::Luluvdo => "Luluvdo",
            Hoster::LoadX => "LoadX",
            Hoster::Filemoon => "Filemoon",
            Hoster::Doodstream => "Doodstream",
        }
    }

    /// Canonical domain.
    pub fn domain(&self) -> &'static str {
        match self {
            Hoster::Vidoza => "vidoza.net",
            Hoster::Vidmoly => "vidmoly.to",
            Hoster::Voe => "voe.sx",
            Hoster::Streamtape => "streamtape.com",
            Hoster::SpeedFiles => "speedfiles.net",
            Hoster::Luluvdo => "luluvdo.com",
            Hoster::LoadX => "loadx.ws",
            Hoster::Filemoon => "filemoon.sx",
            Hoster::Doodstream => "dood.li",
        }
    }

    fn domain_pattern(&self) -> &'static str {
        match self {
            Hoster::Vidoza => r"vidoza\.(?:net|co|org)|videzz\.net",
            Hoster::Vidmoly => r"vidmoly\.(?:to|me|net|biz)",
            Hoster::Voe => r"voe\.sx|voe-?un-?bl(?:oc)?k\d*\.[a-z]+",
            Hoster::Streamtape => {
                r"streamtape\.(?:com|net|to|xyz|cc)|strtape\.[a-z]+|streamta\.pe|stape\.fun|tapecontent\.net"
            }
            Hoster::SpeedFiles => r"speedfiles\.net",
            Hoster::Luluvdo => r"luluvdo\.com|lulustream\.com|luluvid\.com",
            Hoster::LoadX => r"loadx\.ws",
            Hoster::Filemoon => r"filemoon\.(?:sx|to|in|nl|wf|art|eu)|moonplayer\.[a-z]+|kerapoxy\.cc",
            Hoster::Doodstream => {
                r"dood(?:stream)?\.(?:com|watch|to|so|la|ws|pm|re|wf|yt|li|sh|cx|pro)|d0o0d\.com|d000d\.com|ds2play\.com|dooood\.com"
            }
        }
    }

    /// Match a catalog label such as "VOE" or "Doodstream".
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        Hoster::ALL.iter().copied().find(|h| h.key() == wanted)
    }

    pub fn info(&self) -> HosterInfo {
        HosterInfo {
            name: self.display_name().to_string(),
            supported: true,
            key: Some(self.key().to_string()),
            domain: Some(self.domain().to_string()),
        }
    }

    /// Turn a hoster page into a directly playable source.
    pub async fn extract(self, http: &dyn HttpClient, url: &str) -> Result<StreamSource> {
        debug!(hoster = self.key(), url, "Extracting stream");
        match self {
            Hoster::Vidoza => vidoza::extract(http, url).await,
            Hoster::Vidmoly => vidmoly::extract(http, url).await,
            Hoster::Voe => voe::extract(http, url).await,
            Hoster::Streamtape => streamtape::extract(http, url).await,
            Hoster::SpeedFiles => speedfiles::extract(http, url).await,
            Hoster::Luluvdo => luluvdo::extract(http, url).await,
            Hoster::LoadX => loadx::extract(http, url).await,
            Hoster::Filemoon => filemoon::extract(http, url).await,
            Hoster::Doodstream => doodstream::extract(http, url).await,
        }
    }
}

impl std::fmt::Display for Hoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Classify `url` by hoster. Pure; never touches the network.
pub fn identify(url: &str) -> Option<Hoster> {
    let url = url.trim();
    REGISTRY
        .iter()
        .find(|(_, pattern)| pattern.is_match(url))
        .map(|(hoster, _)| *hoster)
}

pub fn is_supported(url: &str) -> bool {
    identify(url).is_some()
}

pub fn hoster_info(url: &str) -> HosterInfo {
    match identify(url) {
        Some(hoster) => hoster.info(),
        None => HosterInfo {
            name: "Unknown".to_string(),
            supported: false,
            key: None,
            domain: markup::host(url),
        },
    }
}

/// Browser-like request headers, optionally with a Referer.
pub(crate) fn browser_options(referer: Option<&str>) -> RequestOptions {
    let options = RequestOptions::new().header("User-Agent", BROWSER_USER_AGENT);
    match referer {
        Some(referer) => options.referer(referer),
        None => options,
    }
}

/// Fetch a hoster page, failing on transport errors and non-2xx.
pub(crate) async fn fetch_page(http: &dyn HttpClient, url: &str, options: &RequestOptions) -> Result<HttpResponse> {
    debug!(url, "Fetching hoster page");
    http.get(url, options).await.into_result()
}

pub(crate) fn direct_source(hoster: Hoster, url: &str) -> StreamSource {
    StreamSource::new(url, StreamFormat::infer(url)).with_server(hoster.display_name())
}

/// Standard alphabet; accepts payloads with or without `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub(crate) fn decode_base64(encoded: &str) -> Option<String> {
    let bytes = LENIENT_BASE64.decode(encoded.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

pub(crate) fn no_stream(hoster: Hoster, url: &str) -> Error {
    Error::Extraction {
        hoster: hoster.key(),
        url: url.to_string(),
    }
}
