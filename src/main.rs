//! cacheprog - persistent build action cache helper
//!
//! Entry point: resolves configuration, sets up logging on stderr and serves
//! the cache protocol on stdin/stdout until the build tool closes the pipe.

use cacheprog::cache::Cache;
use cacheprog::cli::Cli;
use cacheprog::config::{ConfigManager, LogFormat, Settings};
use cacheprog::error::CacheProgResult;
use cacheprog::protocol::RequestHandler;
use cacheprog::storage::FileSystemStorage;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{self, BufReader, BufWriter};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheProgResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;
    let settings = ConfigManager::resolve(&config, cli.cache_dir, cli.verbose)?;

    init_logging(&settings);
    debug!("Using config file {}", config_manager.path().display());

    let store = FileSystemStorage::new(&settings.cache_dir).await?;
    info!("Using cache directory: {}", store.base_dir().display());
    let cache = Arc::new(Cache::new(Arc::new(store)));

    let reader = BufReader::new(io::stdin());
    let writer = BufWriter::new(io::stdout());
    let mut handler = RequestHandler::new(reader, writer, Arc::clone(&cache)).await?;
    handler.run().await?;

    if settings.verbose() {
        let stats = handler.stats();
        info!(
            "Gets: {}, GetMiss: {}, Indexed: {}",
            stats.gets,
            stats.get_misses,
            cache.len().await
        );
    }
    Ok(())
}

/// Logging: 0 = warn, 1 = debug, 2+ = trace. Always stderr; stdout carries
/// the protocol.
fn init_logging(settings: &Settings) {
    let filter = match settings.verbosity {
        0 => EnvFilter::new("cacheprog=warn"),
        1 => EnvFilter::new("cacheprog=debug"),
        _ => EnvFilter::new("cacheprog=trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match settings.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
