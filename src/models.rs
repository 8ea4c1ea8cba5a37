//! Canonical entity graph shared by providers, extractors and the facade.
//!
//! Everything serializes camelCase, the shape host runtimes consume.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anime {
    /// Site slug.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub alt_titles: Vec<String>,
    pub cover: Option<String>,
    pub banner: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub cast: Vec<CastRole>,
    pub status: Option<String>,
    pub start_year: Option<u32>,
    pub end_year: Option<u32>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

/// People credited under one role ("director", "actor", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastRole {
    pub role: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    /// 0 is the movies pseudo-season.
    pub season_number: u32,
    pub title: String,
    pub is_movies: bool,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    /// `"{season}-{episode}"` or `"filme-{episode}"`.
    pub id: String,
    pub number: u32,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<StreamSource>,
}

/// Parsed form of an episode id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeKey {
    Episode { season: u32, episode: u32 },
    Movie(u32),
}

const MOVIE_PREFIX: &str = "filme";

impl EpisodeKey {
    pub fn parse(id: &str) -> Option<Self> {
        let (head, tail) = id.split_once('-')?;
        let number: u32 = tail.parse().ok()?;
        if head == MOVIE_PREFIX {
            return Some(EpisodeKey::Movie(number));
        }
        let season: u32 = head.parse().ok()?;
        Some(EpisodeKey::Episode {
            season,
            episode: number,
        })
    }

    pub fn id(&self) -> String {
        match self {
            EpisodeKey::Episode { season, episode } => format!("{}-{}", season, episode),
            EpisodeKey::Movie(number) => format!("{}-{}", MOVIE_PREFIX, number),
        }
    }

    pub fn season_number(&self) -> u32 {
        match self {
            EpisodeKey::Episode { season, .. } => *season,
            EpisodeKey::Movie(_) => 0,
        }
    }

    pub fn number(&self) -> u32 {
        match self {
            EpisodeKey::Episode { episode, .. } => *episode,
            EpisodeKey::Movie(number) => *number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    M3u8,
    Mp4,
    Mkv,
    Webm,
    Torrent,
    /// Hoster page; needs `extract_stream`.
    Embed,
    /// Provider-side indirection; needs `extract_stream`.
    Redirect,
}

impl StreamFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::M3u8 => "m3u8",
            StreamFormat::Mp4 => "mp4",
            StreamFormat::Mkv => "mkv",
            StreamFormat::Webm => "webm",
            StreamFormat::Torrent => "torrent",
            StreamFormat::Embed => "embed",
            StreamFormat::Redirect => "redirect",
        }
    }

    /// Whether the url still has to go through `extract_stream`.
    pub fn is_indirect(&self) -> bool {
        matches!(self, StreamFormat::Embed | StreamFormat::Redirect)
    }

    /// Classify a direct media URL. Unknown extensions fall back to mp4.
    pub fn infer(url: &str) -> Self {
        let lower = url.to_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or(&lower);

        if lower.contains(".m3u8") || lower.contains("/hls/") {
            StreamFormat::M3u8
        } else if path.ends_with(".mkv") {
            StreamFormat::Mkv
        } else if path.ends_with(".webm") {
            StreamFormat::Webm
        } else if lower.starts_with("magnet:") || path.ends_with(".torrent") {
            StreamFormat::Torrent
        } else {
            StreamFormat::Mp4
        }
    }
}

impl std::fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSource {
    pub url: String,
    pub format: StreamFormat,
    pub quality: String,
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_headers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_hls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl StreamSource {
    pub fn new(url: impl Into<String>, format: StreamFormat) -> Self {
        Self {
            url: url.into(),
            format,
            quality: "auto".to_string(),
            server: None,
            headers: HashMap::new(),
            is_default: false,
            requires_headers: None,
            force_hls: None,
            language: None,
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    /// Mark that playback must replay `headers`.
    pub fn requiring_headers(mut self) -> Self {
        self.requires_headers = Some(true);
        self
    }

    pub fn forcing_hls(mut self) -> Self {
        self.force_hls = Some(true);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub alt_titles: Vec<String>,
    pub cover: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSummary {
    pub id: String,
    pub number: u32,
    pub season_number: u32,
    pub is_movie: bool,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetails {
    #[serde(flatten)]
    pub anime: Anime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnimeDetails {
    /// Degraded result: only the requested id plus the failure.
    pub fn failed(id: &str, error: String) -> Self {
        Self {
            anime: Anime {
                id: id.to_string(),
                ..Default::default()
            },
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub results: Vec<T>,
    pub has_next_page: bool,
    pub current_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> PaginatedResult<T> {
    pub fn empty(page: u32) -> Self {
        Self {
            results: Vec::new(),
            has_next_page: false,
            current_page: page,
            total_results: None,
            error: None,
        }
    }

    pub fn failed(page: u32, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::empty(page)
        }
    }

    /// All results on one page, nothing after it.
    pub fn single_page(results: Vec<T>, page: u32) -> Self {
        let total = u32::try_from(results.len()).ok();
        Self {
            results,
            has_next_page: false,
            current_page: page,
            total_results: total,
            error: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HosterInfo {
    pub name: String,
    pub supported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_key_parse() {
        assert_eq!(
            EpisodeKey::parse("2-7"),
            Some(EpisodeKey::Episode {
                season: 2,
                episode: 7
            })
        );
        assert_eq!(EpisodeKey::parse("filme-3"), Some(EpisodeKey::Movie(3)));
        assert_eq!(EpisodeKey::parse("film-3"), None);
        assert_eq!(EpisodeKey::parse("3"), None);
        assert_eq!(EpisodeKey::parse("1-x"), None);
    }

    #[test]
    fn test_episode_key_id() {
        assert_eq!(EpisodeKey::Movie(1).id(), "filme-1");
        assert_eq!(
            EpisodeKey::Episode {
                season: 1,
                episode: 12
            }
            .id(),
            "1-12"
        );
    }

    #[test]
    fn test_format_inference() {
        assert_eq!(StreamFormat::infer("https://cdn.x/master.m3u8?t=1"), StreamFormat::M3u8);
        assert_eq!(StreamFormat::infer("https://cdn.x/hls/abc/index"), StreamFormat::M3u8);
        assert_eq!(StreamFormat::infer("https://cdn.x/video.mp4"), StreamFormat::Mp4);
        assert_eq!(StreamFormat::infer("https://cdn.x/video.mkv?x=y"), StreamFormat::Mkv);
        assert_eq!(StreamFormat::infer("https://cdn.x/get_video?id=1"), StreamFormat::Mp4);
    }

    #[test]
    fn test_stream_source_serializes_camel_case() {
        let source = StreamSource::new("https://x/a.m3u8", StreamFormat::M3u8).forcing_hls();
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"isDefault\":false"));
        assert!(json.contains("\"forceHls\":true"));
        assert!(json.contains("\"format\":\"m3u8\""));
        assert!(!json.contains("requiresHeaders"));
    }

    #[test]
    fn test_failed_details_keeps_id() {
        let details = AnimeDetails::failed("naruto", "connectivity: down".to_string());
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["id"], "naruto");
        assert_eq!(json["error"], "connectivity: down");
    }
}
