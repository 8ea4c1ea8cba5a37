//! Cache-through capability surface over one [`MediaProvider`].
//!
//! Every method here is infallible from the caller's point of view:
//! provider and extractor failures come back as empty lists, error-tagged
//! envelopes or `None`, and are never cached.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::cache::{CachePolicy, CacheStore};
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::hoster::{self, redirect};
use crate::http::HttpClient;
use crate::models::{AnimeDetails, AnimeSummary, EpisodeSummary, HosterInfo, PaginatedResult, StreamSource};
use crate::provider::MediaProvider;
use crate::storage::Storage;

/// Deterministic key: operation name and arguments joined with `:`.
fn cache_key(operation: &str, args: &[&str]) -> String {
    std::iter::once(operation)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(":")
}

fn store<V>(family: &str, max_entries: usize, ttl_secs: u64, storage: &Arc<dyn Storage>) -> CacheStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    CacheStore::load(
        format!("cache.{}", family),
        CachePolicy::new(max_entries, Duration::from_secs(ttl_secs)),
        Arc::clone(storage),
    )
}

async fn paginated<T, F>(
    cache: &CacheStore<PaginatedResult<T>>,
    key: String,
    page: u32,
    fetch: F,
) -> PaginatedResult<T>
where
    T: Clone + Serialize + DeserializeOwned,
    F: Future<Output = Result<PaginatedResult<T>>>,
{
    if let Some(hit) = cache.get(&key) {
        debug!(key = %key, "Cache hit");
        return hit;
    }
    match fetch.await {
        Ok(result) => {
            if !result.is_error() {
                cache.set(&key, result.clone());
            }
            result
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Provider call failed");
            PaginatedResult::failed(page, e.tagged())
        }
    }
}

pub struct ProviderFacade {
    provider: Arc<dyn MediaProvider>,
    http: Arc<dyn HttpClient>,
    search: CacheStore<PaginatedResult<AnimeSummary>>,
    popular: CacheStore<PaginatedResult<AnimeSummary>>,
    latest: CacheStore<PaginatedResult<AnimeSummary>>,
    episodes: CacheStore<PaginatedResult<EpisodeSummary>>,
    streams: CacheStore<Vec<StreamSource>>,
    details: CacheStore<AnimeDetails>,
    extract: CacheStore<StreamSource>,
}

impl ProviderFacade {
    pub fn new(
        provider: Arc<dyn MediaProvider>,
        http: Arc<dyn HttpClient>,
        storage: Arc<dyn Storage>,
        config: &CacheConfig,
    ) -> Self {
        let max = config.max_entries;
        Self {
            provider,
            http,
            search: store("search", max, config.search_ttl_secs, &storage),
            popular: store("popular", max, config.popular_ttl_secs, &storage),
            latest: store("latest", max, config.latest_ttl_secs, &storage),
            episodes: store("episodes", max, config.episodes_ttl_secs, &storage),
            streams: store("streams", max, config.streams_ttl_secs, &storage),
            details: store("details", max, config.details_ttl_secs, &storage),
            extract: store("extract", max, config.extract_ttl_secs, &storage),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn search(&self, query: &str, page: u32) -> PaginatedResult<AnimeSummary> {
        let key = cache_key("search", &[query.trim(), &page.to_string()]);
        paginated(&self.search, key, page, self.provider.search(query, page)).await
    }

    pub async fn get_popular(&self, page: u32) -> PaginatedResult<AnimeSummary> {
        let key = cache_key("popular", &[&page.to_string()]);
        paginated(&self.popular, key, page, self.provider.get_popular(page)).await
    }

    pub async fn get_latest(&self, page: u32) -> PaginatedResult<AnimeSummary> {
        let key = cache_key("latest", &[&page.to_string()]);
        paginated(&self.latest, key, page, self.provider.get_latest(page)).await
    }

    pub async fn get_episodes(&self, anime_id: &str, page: u32) -> PaginatedResult<EpisodeSummary> {
        let key = cache_key("episodes", &[anime_id, &page.to_string()]);
        paginated(&self.episodes, key, page, self.provider.get_episodes(anime_id, page)).await
    }

    pub async fn get_streams(&self, anime_id: &str, episode_id: &str) -> Vec<StreamSource> {
        let key = cache_key("streams", &[anime_id, episode_id]);
        if let Some(hit) = self.streams.get(&key) {
            return hit;
        }
        match self.provider.get_streams(anime_id, episode_id).await {
            Ok(sources) => {
                self.streams.set(&key, sources.clone());
                sources
            }
            Err(e) => {
                warn!(anime_id, episode_id, error = %e, "Listing streams failed");
                Vec::new()
            }
        }
    }

    pub async fn get_anime_details(&self, anime_id: &str) -> AnimeDetails {
        let key = cache_key("details", &[anime_id]);
        if let Some(hit) = self.details.get(&key) {
            return hit;
        }
        match self.provider.get_anime_details(anime_id).await {
            Ok(details) => {
                if details.error.is_none() {
                    self.details.set(&key, details.clone());
                }
                details
            }
            Err(e) => {
                warn!(anime_id, error = %e, "Loading details failed");
                AnimeDetails::failed(anime_id, e.tagged())
            }
        }
    }

    /// Turn an embed or redirect source URL into a playable one.
    pub async fn extract_stream(&self, url: &str) -> Option<StreamSource> {
        let url = url.trim();
        let key = cache_key("extract", &[url]);
        if let Some(hit) = self.extract.get(&key) {
            return Some(hit);
        }
        match self.resolve_and_extract(url).await {
            Ok(source) => {
                self.extract.set(&key, source.clone());
                Some(source)
            }
            Err(e) => {
                warn!(url, category = e.category(), error = %e, "Stream extraction failed");
                None
            }
        }
    }

    async fn resolve_and_extract(&self, url: &str) -> Result<StreamSource> {
        let resolved = redirect::resolve(self.http.as_ref(), url)
            .await
            .ok_or_else(|| Error::RedirectUnresolved(url.to_string()))?;
        let hoster = hoster::identify(&resolved).ok_or_else(|| Error::UnsupportedHoster(resolved.clone()))?;

        let mut source = hoster.extract(self.http.as_ref(), &resolved).await?;
        source.is_default = true;
        info!(url, hoster = hoster.key(), stream = %source.url, "Extracted stream");
        Ok(source)
    }

    pub fn get_hoster_info(&self, url: &str) -> HosterInfo {
        hoster::hoster_info(url)
    }

    pub fn is_supported(&self, url: &str) -> bool {
        hoster::is_supported(url)
    }
}
