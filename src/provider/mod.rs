use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AnimeDetails, AnimeSummary, EpisodeSummary, PaginatedResult, StreamSource};

pub mod aniworld;

pub use aniworld::AniWorldProvider;

/// One catalog site, normalized into the shared entity graph.
///
/// Implementations may fail; the facade turns every failure into a
/// degraded result.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, page: u32) -> Result<PaginatedResult<AnimeSummary>>;

    async fn get_popular(&self, page: u32) -> Result<PaginatedResult<AnimeSummary>>;

    async fn get_latest(&self, page: u32) -> Result<PaginatedResult<AnimeSummary>>;

    async fn get_episodes(&self, anime_id: &str, page: u32) -> Result<PaginatedResult<EpisodeSummary>>;

    async fn get_streams(&self, anime_id: &str, episode_id: &str) -> Result<Vec<StreamSource>>;

    async fn get_anime_details(&self, anime_id: &str) -> Result<AnimeDetails>;
}
