use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mobile Chrome UA; several hosters serve a different player to unknown agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36 Edg/131.0.0.0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_true")]
    pub persist: bool,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
    #[serde(default = "default_popular_ttl")]
    pub popular_ttl_secs: u64,
    #[serde(default = "default_latest_ttl")]
    pub latest_ttl_secs: u64,
    #[serde(default = "default_episodes_ttl")]
    pub episodes_ttl_secs: u64,
    #[serde(default = "default_streams_ttl")]
    pub streams_ttl_secs: u64,
    #[serde(default = "default_details_ttl")]
    pub details_ttl_secs: u64,
    #[serde(default = "default_extract_ttl")]
    pub extract_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_entries() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_search_ttl() -> u64 {
    5 * 60
}

fn default_popular_ttl() -> u64 {
    30 * 60
}

fn default_latest_ttl() -> u64 {
    15 * 60
}

fn default_episodes_ttl() -> u64 {
    60 * 60
}

fn default_streams_ttl() -> u64 {
    10 * 60
}

fn default_details_ttl() -> u64 {
    60 * 60
}

fn default_extract_ttl() -> u64 {
    5 * 60 // doodstream tokens expire quickly
}

fn default_base_url() -> String {
    "https://aniworld.to".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            persist: true,
            search_ttl_secs: default_search_ttl(),
            popular_ttl_secs: default_popular_ttl(),
            latest_ttl_secs: default_latest_ttl(),
            episodes_ttl_secs: default_episodes_ttl(),
            streams_ttl_secs: default_streams_ttl(),
            details_ttl_secs: default_details_ttl(),
            extract_ttl_secs: default_extract_ttl(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "nagare").ok_or(Error::NoConfigDir)
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn cache_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("cache.json"))
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = config_path()?;

        if !path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
