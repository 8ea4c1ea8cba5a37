use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use nagare::cli::{self, Cli};
use nagare::config::{self, Config};
use nagare::http::ReqwestHttp;
use nagare::provider::AniWorldProvider;
use nagare::storage::{FileStorage, MemoryStorage, Storage};
use nagare::{ProviderFacade, Result};

fn setup_logging() -> Result<()> {
    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let file_appender = tracing_appender::rolling::daily(&data_dir, "nagare.log");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nagare=info")))
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .init();

    Ok(())
}

fn open_storage(config: &Config) -> Arc<dyn Storage> {
    if !config.cache.persist {
        return Arc::new(MemoryStorage::new());
    }
    match config::cache_path().and_then(FileStorage::open) {
        Ok(storage) => {
            debug!(path = %storage.path().display(), "Using cache file");
            Arc::new(storage)
        }
        Err(e) => {
            warn!(error = %e, "Cache file unavailable, using memory");
            Arc::new(MemoryStorage::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON output, so logs go to a file
    if let Err(e) = setup_logging() {
        eprintln!("Warning: Could not set up logging: {}", e);
    }

    let cli = Cli::parse();
    let config = Config::load()?;
    info!(command = ?cli.command, "Starting nagare");

    let http = Arc::new(ReqwestHttp::new(&config.http.user_agent, config.http.timeout())?);
    let provider = Arc::new(AniWorldProvider::new(http.clone(), &config.provider));
    let facade = ProviderFacade::new(provider, http, open_storage(&config), &config.cache);
    debug!(provider = facade.provider_name(), "Facade ready");

    let output = cli::run(&cli.command, &facade).await?;
    println!("{}", output);
    Ok(())
}
