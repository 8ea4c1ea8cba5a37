//! Adapter for the AniWorld catalog.
//!
//! Series pages carry the whole season and episode graph as plain links
//! (`/staffel-S/episode-E`, `/filme/film-N`), episode pages carry one
//! `<li data-link-target>` block per hoster mirror. All of it is read with
//! regexes over the raw markup.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::MediaProvider;
use crate::config::{BROWSER_USER_AGENT, ProviderConfig};
use crate::error::{Error, Result};
use crate::hoster::{self, Hoster};
use crate::hoster::redirect::is_redirect_shape;
use crate::http::{HttpClient, RequestOptions, fetch_ok};
use crate::markup::{self, entities};
use crate::models::{
    Anime, AnimeDetails, AnimeSummary, CastRole, Episode, EpisodeKey, EpisodeSummary, PaginatedResult, Season,
    StreamFormat, StreamSource,
};

const STATUS_AIRING: &str = "AIRING";
const STATUS_FINISHED: &str = "FINISHED";
const MOVIES_TITLE: &str = "Filme";
const CAST_ROLES: [&str; 4] = ["director", "actor", "creator", "producer"];

static SERIES_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?://[^/]+)?/anime/stream/([a-z0-9-]+)/?$").unwrap());

static CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*["'](?:https?://[^/"']+)?/anime/stream/([a-z0-9-]+)/?["'][^>]*>(.*?)</a>"#)
        .unwrap()
});

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<h3[^>]*>(.*?)</h3>").unwrap());

static EPISODE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/staffel-(\d+)/episode-(\d+)\b").unwrap());

static MOVIE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/filme/film-(\d+)\b").unwrap());

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap()
});

static STRONG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<strong[^>]*>(.*?)</strong>").unwrap());

static SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<span[^>]*>(.*?)</span>").unwrap());

static TITLE: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?is)<div[^>]*class\s*=\s*["'][^"']*series-title[^"']*["'][^>]*>\s*<h1[^>]*>(.*?)</h1>"#).unwrap(),
        Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap(),
        Regex::new(r#"(?is)<meta[^>]*property\s*=\s*["']og:title["'][^>]*content\s*=\s*["']([^"']+)["']"#).unwrap(),
    ]
});

static ALT_TITLES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-alternativetitles\s*=\s*"([^"]*)""#).unwrap());

static COVER: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?is)seriesCoverBox.*?<img\b[^>]*?\sdata-src\s*=\s*["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?is)seriesCoverBox.*?<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).unwrap(),
    ]
});

static BACKDROP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class\s*=\s*["'][^"']*backdrop[^"']*["'][^>]*style\s*=\s*["'][^"']*background-image\s*:\s*url\(\s*['"]?([^'")]+)"#)
        .unwrap()
});

static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)data-full-description\s*=\s*"([^"]*)""#).unwrap());

static GENRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<a\b[^>]*itemprop\s*=\s*["']genre["'][^>]*>(.*?)</a>"#).unwrap());

static ITEMPROP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)itemprop\s*=\s*["']name["'][^>]*>(.*?)</"#).unwrap());

static START_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)itemprop\s*=\s*["']startDate["'][^>]*>(.*?)</span>"#).unwrap());

static END_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)itemprop\s*=\s*["']endDate["'][^>]*>(.*?)</span>"#).unwrap());

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

static RATING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"itemprop\s*=\s*["']ratingValue["'][^>]*>\s*([\d.,]+)"#).unwrap());

static LINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<li\b([^>]*?\sdata-link-target\s*=\s*["']([^"']+)["'][^>]*)>(.*?)</li>"#).unwrap()
});

static LANG_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-lang-key\s*=\s*["'](\d+)["']"#).unwrap());

static HOSTER_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<h4[^>]*>(.*?)</h4>").unwrap());

static HOSTER_ICON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"title\s*=\s*["']Hoster\s+([^"']+)["']"#).unwrap());

static NAMED_LINK_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:data-link-target|data-embed-url|data-src-url|data-play-url)\s*=\s*["']([^"']+)["']"#).unwrap()
});

static REDIRECT_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href\s*=\s*["']((?:https?://[^/"']+)?/(?:redirect|go)/\d+)["']"#).unwrap()
});

fn language_label(key: &str) -> Option<&'static str> {
    match key {
        "1" => Some("German Dub"),
        "2" => Some("English Sub"),
        "3" => Some("German Sub"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: String,
}

/// One episode reference found on a series page.
#[derive(Debug, Clone, PartialEq)]
struct EpisodeRef {
    key: EpisodeKey,
    title: Option<String>,
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

fn parse_search(body: &str) -> Result<Vec<AnimeSummary>> {
    let hits: Vec<SearchHit> =
        serde_json::from_str(body.trim()).map_err(|e| Error::Parse(format!("search response: {}", e)))?;

    let mut seen = HashSet::new();
    Ok(hits
        .into_iter()
        .filter_map(|hit| {
            let slug = SERIES_LINK.captures(hit.link.trim())?.get(1)?.as_str().to_string();
            if !seen.insert(slug.clone()) {
                return None;
            }
            Some(AnimeSummary {
                id: slug,
                title: markup::clean_text(&hit.title),
                description: hit.description.map(|d| markup::clean_text(&d)).and_then(non_empty),
                ..Default::default()
            })
        })
        .collect())
}

/// Catalog cards (`<a href="/anime/stream/<slug>">` with a heading or cover).
fn parse_cards(html: &str, base: &str) -> Vec<AnimeSummary> {
    let mut seen = HashSet::new();
    let mut cards = Vec::new();

    for caps in CARD.captures_iter(html) {
        let slug = caps[1].to_string();
        let inner = &caps[2];

        let title = markup::capture_first(inner, &[&HEADING])
            .map(|h| markup::clean_text(&h))
            .and_then(non_empty)
            .or_else(|| markup::tag_attr(inner, "img", "alt").map(|alt| entities::decode(&alt)));
        let Some(title) = title else {
            continue;
        };
        if !seen.insert(slug.clone()) {
            continue;
        }

        let cover = markup::tag_attr(inner, "img", "data-src")
            .or_else(|| markup::tag_attr(inner, "img", "src"))
            .and_then(|src| markup::absolutize(base, &entities::decode(&src)));

        cards.push(AnimeSummary {
            id: slug,
            title,
            cover,
            ..Default::default()
        });
    }
    cards
}

fn episode_title(anchor_inner: &str) -> Option<String> {
    markup::capture_first(anchor_inner, &[&STRONG])
        .or_else(|| markup::capture_first(anchor_inner, &[&SPAN]))
        .map(|t| markup::clean_text(&t))
        .and_then(non_empty)
}

/// Every episode and movie linked from a series page, deduplicated and
/// ordered movies first, then by (season, episode).
fn parse_episode_graph(html: &str) -> Vec<EpisodeRef> {
    let mut titles: HashMap<String, String> = HashMap::new();
    for caps in ANCHOR.captures_iter(html) {
        let Some(key) = link_key(&caps[1]) else {
            continue;
        };
        if let Some(title) = episode_title(&caps[2]) {
            titles.entry(key.id()).or_insert(title);
        }
    }

    let episodes = EPISODE_LINK.captures_iter(html).filter_map(|caps| {
        Some(EpisodeKey::Episode {
            season: caps[1].parse().ok()?,
            episode: caps[2].parse().ok()?,
        })
    });
    let movies = MOVIE_LINK
        .captures_iter(html)
        .filter_map(|caps| caps[1].parse().ok().map(EpisodeKey::Movie));

    let mut seen = HashSet::new();
    let mut refs: Vec<EpisodeRef> = episodes
        .chain(movies)
        .filter(|key| seen.insert(key.id()))
        .map(|key| EpisodeRef {
            title: titles.get(&key.id()).cloned(),
            key,
        })
        .collect();

    refs.sort_by_key(|r| (r.key.season_number(), r.key.number()));
    refs
}

fn link_key(href: &str) -> Option<EpisodeKey> {
    if let Some(caps) = EPISODE_LINK.captures(href) {
        return Some(EpisodeKey::Episode {
            season: caps[1].parse().ok()?,
            episode: caps[2].parse().ok()?,
        });
    }
    MOVIE_LINK
        .captures(href)
        .and_then(|caps| caps[1].parse().ok())
        .map(EpisodeKey::Movie)
}

fn group_seasons(refs: &[EpisodeRef]) -> Vec<Season> {
    let mut seasons: Vec<Season> = Vec::new();
    for r in refs {
        let number = r.key.season_number();
        if seasons.last().is_none_or(|s| s.season_number != number) {
            let is_movies = matches!(r.key, EpisodeKey::Movie(_));
            seasons.push(Season {
                season_number: number,
                title: if is_movies {
                    MOVIES_TITLE.to_string()
                } else {
                    format!("Staffel {}", number)
                },
                is_movies,
                episodes: Vec::new(),
            });
        }
        if let Some(season) = seasons.last_mut() {
            season.episodes.push(Episode {
                id: r.key.id(),
                number: r.key.number(),
                title: r.title.clone(),
                ..Default::default()
            });
        }
    }
    seasons
}

fn parse_cast(html: &str) -> Vec<CastRole> {
    CAST_ROLES
        .iter()
        .filter_map(|role| {
            let pattern = Regex::new(&format!(
                r#"(?is)<li\b[^>]*itemprop\s*=\s*["']{}["'][^>]*>(.*?)</li>"#,
                role
            ))
            .ok()?;
            let mut names: Vec<String> = Vec::new();
            for caps in pattern.captures_iter(html) {
                let name = markup::capture_first(&caps[1], &[&ITEMPROP_NAME])
                    .map(|n| markup::clean_text(&n))
                    .unwrap_or_else(|| markup::clean_text(&caps[1]));
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
            (!names.is_empty()).then(|| CastRole {
                role: role.to_string(),
                names,
            })
        })
        .collect()
}

fn parse_year(text: &str) -> Option<u32> {
    YEAR.captures(text).and_then(|caps| caps[1].parse().ok())
}

fn parse_details(slug: &str, html: &str, base: &str) -> Anime {
    let title = markup::capture_first(html, &TITLE.iter().collect::<Vec<_>>())
        .map(|t| markup::clean_text(&t))
        .and_then(non_empty)
        .unwrap_or_else(|| slug.to_string());

    let alt_titles = markup::capture_first(html, &[&ALT_TITLES])
        .map(|raw| {
            entities::decode(&raw)
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty() && *t != title)
                .collect()
        })
        .unwrap_or_default();

    let mut genres: Vec<String> = Vec::new();
    for caps in GENRE.captures_iter(html) {
        let genre = markup::clean_text(&caps[1]);
        if !genre.is_empty() && !genres.contains(&genre) {
            genres.push(genre);
        }
    }

    let start = markup::capture_first(html, &[&START_DATE]).map(|s| markup::clean_text(&s));
    let end = markup::capture_first(html, &[&END_DATE]).map(|s| markup::clean_text(&s));
    let airing = end.as_deref().is_some_and(|e| e.to_lowercase().contains("heute"));
    let status = match (&start, &end) {
        (None, None) => None,
        _ if airing => Some(STATUS_AIRING.to_string()),
        _ => Some(STATUS_FINISHED.to_string()),
    };

    let image = |patterns: &[&Regex]| {
        markup::capture_first(html, patterns).and_then(|src| markup::absolutize(base, &entities::decode(&src)))
    };

    Anime {
        id: slug.to_string(),
        title,
        alt_titles,
        cover: image(&COVER.iter().collect::<Vec<_>>()),
        banner: image(&[&BACKDROP]),
        description: markup::capture_first(html, &[&DESCRIPTION])
            .map(|d| markup::clean_text(&d))
            .and_then(non_empty),
        genres,
        cast: parse_cast(html),
        status,
        start_year: start.as_deref().and_then(parse_year),
        end_year: if airing { None } else { end.as_deref().and_then(parse_year) },
        rating: markup::capture_first(html, &[&RATING]).and_then(|r| r.replace(',', ".").parse().ok()),
        seasons: group_seasons(&parse_episode_graph(html)),
    }
}

/// Stream links on an episode page in first-discovered order, one per URL.
///
/// Link blocks are scanned before the bare attribute and redirect shapes so
/// the block's hoster name and language claim each URL.
fn parse_streams(html: &str, base: &str) -> Vec<StreamSource> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    let mut push = |raw: &str, server: Option<String>, language: Option<&str>| {
        let Some(url) = markup::absolutize(base, &entities::decode(raw)) else {
            return;
        };
        if !seen.insert(url.clone()) {
            return;
        }
        let format = if is_redirect_shape(&url) {
            StreamFormat::Redirect
        } else {
            StreamFormat::Embed
        };
        let server = server.or_else(|| hoster::identify(&url).map(|h| h.display_name().to_string()));
        let mut source = StreamSource::new(url, format);
        source.server = server;
        source.language = language.map(str::to_string);
        sources.push(source);
    };

    for caps in LINK_BLOCK.captures_iter(html) {
        let attrs = &caps[1];
        let inner = &caps[3];
        let server = markup::capture_first(inner, &[&HOSTER_HEADING])
            .map(|h| markup::clean_text(&h))
            .and_then(non_empty)
            .or_else(|| markup::capture_first(inner, &[&HOSTER_ICON]).map(|h| entities::decode(&h)))
            .map(|label| Hoster::from_name(&label).map_or(label, |h| h.display_name().to_string()));
        let language = markup::capture_first(attrs, &[&LANG_KEY]).and_then(|k| language_label(&k));
        push(&caps[2], server, language);
    }
    for caps in NAMED_LINK_ATTR.captures_iter(html) {
        push(&caps[1], None, None);
    }
    for caps in REDIRECT_HREF.captures_iter(html) {
        push(&caps[1], None, None);
    }
    sources
}

pub struct AniWorldProvider {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl AniWorldProvider {
    pub fn new(http: Arc<dyn HttpClient>, config: &ProviderConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn options(&self) -> RequestOptions {
        RequestOptions::new()
            .header("User-Agent", BROWSER_USER_AGENT)
            .referer(format!("{}/", self.base_url))
    }

    fn series_url(&self, anime_id: &str) -> Result<String> {
        let slug = anime_id.trim();
        if slug.is_empty() || slug.contains('/') {
            return Err(Error::Parse(format!("invalid anime id {:?}", anime_id)));
        }
        Ok(format!("{}/anime/stream/{}", self.base_url, slug))
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        Ok(fetch_ok(self.http.as_ref(), url, &self.options()).await?.body)
    }

    async fn catalog_page(&self, path: &str, page: u32) -> Result<PaginatedResult<AnimeSummary>> {
        if page > 1 {
            return Ok(PaginatedResult::empty(page));
        }
        let url = format!("{}{}", self.base_url, path);
        let html = self.fetch_html(&url).await?;
        let cards = parse_cards(&html, &self.base_url);
        debug!(url = %url, count = cards.len(), "Parsed catalog page");
        Ok(PaginatedResult::single_page(cards, page))
    }
}

#[async_trait]
impl MediaProvider for AniWorldProvider {
    fn name(&self) -> &str {
        "AniWorld"
    }

    async fn search(&self, query: &str, page: u32) -> Result<PaginatedResult<AnimeSummary>> {
        let query = query.trim();
        if query.is_empty() || page > 1 {
            return Ok(PaginatedResult::empty(page));
        }

        let url = format!("{}/ajax/search", self.base_url);
        let options = self
            .options()
            .header("X-Requested-With", "XMLHttpRequest")
            .form_field("keyword", query);

        let response = match self.http.post(&url, "", &options).await.into_result() {
            Ok(response) => response,
            Err(e) => {
                warn!(query, error = %e, "Search request failed");
                return Ok(PaginatedResult::failed(page, e.tagged()));
            }
        };

        match parse_search(&response.body) {
            Ok(results) => Ok(PaginatedResult::single_page(results, page)),
            Err(e) => {
                warn!(query, error = %e, "Search response unreadable");
                Ok(PaginatedResult::failed(page, e.tagged()))
            }
        }
    }

    async fn get_popular(&self, page: u32) -> Result<PaginatedResult<AnimeSummary>> {
        self.catalog_page("/beliebte-animes", page).await
    }

    async fn get_latest(&self, page: u32) -> Result<PaginatedResult<AnimeSummary>> {
        self.catalog_page("/neu", page).await
    }

    async fn get_episodes(&self, anime_id: &str, page: u32) -> Result<PaginatedResult<EpisodeSummary>> {
        let url = self.series_url(anime_id)?;
        if page > 1 {
            return Ok(PaginatedResult::empty(page));
        }
        let html = self.fetch_html(&url).await?;
        let episodes = parse_episode_graph(&html)
            .into_iter()
            .map(|r| EpisodeSummary {
                id: r.key.id(),
                number: r.key.number(),
                season_number: r.key.season_number(),
                is_movie: matches!(r.key, EpisodeKey::Movie(_)),
                title: r.title,
                thumbnail: None,
            })
            .collect();
        Ok(PaginatedResult::single_page(episodes, page))
    }

    async fn get_streams(&self, anime_id: &str, episode_id: &str) -> Result<Vec<StreamSource>> {
        let series = self.series_url(anime_id)?;
        let key = EpisodeKey::parse(episode_id).ok_or_else(|| Error::InvalidEpisodeId(episode_id.to_string()))?;
        let url = match key {
            EpisodeKey::Episode { season, episode } => format!("{}/staffel-{}/episode-{}", series, season, episode),
            EpisodeKey::Movie(number) => format!("{}/filme/film-{}", series, number),
        };

        let html = self.fetch_html(&url).await?;
        let mut sources = parse_streams(&html, &self.base_url);
        // First discovered wins; mirrors are never reordered.
        if let Some(first) = sources.first_mut() {
            first.is_default = true;
        }
        debug!(url = %url, count = sources.len(), "Parsed stream links");
        Ok(sources)
    }

    async fn get_anime_details(&self, anime_id: &str) -> Result<AnimeDetails> {
        let url = self.series_url(anime_id)?;
        let html = self.fetch_html(&url).await?;
        Ok(AnimeDetails {
            anime: parse_details(anime_id.trim(), &html, &self.base_url),
            error: None,
        })
    }
}
