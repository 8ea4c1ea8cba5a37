use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::error::Result;
use crate::facade::ProviderFacade;

#[derive(Parser, Debug)]
#[command(name = "nagare")]
#[command(about = "Stream extraction and anime catalog lookups", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Search the catalog
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Most popular series
    Popular {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Recently added series
    Latest {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Episodes of one series
    Episodes {
        anime: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Stream links of one episode ("1-3" or "filme-1")
    Streams { anime: String, episode: String },
    /// Full series details
    Details { anime: String },
    /// Resolve an embed or redirect link to a playable stream
    Extract { url: String },
    /// Identify the hoster of a URL without fetching it
    Hoster { url: String },
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run one command and render its result as pretty JSON.
pub async fn run(command: &Command, facade: &ProviderFacade) -> Result<String> {
    match command {
        Command::Search { query, page } => pretty(&facade.search(query, *page).await),
        Command::Popular { page } => pretty(&facade.get_popular(*page).await),
        Command::Latest { page } => pretty(&facade.get_latest(*page).await),
        Command::Episodes { anime, page } => pretty(&facade.get_episodes(anime, *page).await),
        Command::Streams { anime, episode } => pretty(&facade.get_streams(anime, episode).await),
        Command::Details { anime } => pretty(&facade.get_anime_details(anime).await),
        Command::Extract { url } => pretty(&facade.extract_stream(url).await),
        Command::Hoster { url } => pretty(&facade.get_hoster_info(url)),
    }
}
