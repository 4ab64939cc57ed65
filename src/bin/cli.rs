//! Meeting document harvester CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use meeting_harvester::{
    error::Result,
    models::Config,
    pipeline::{self, HarvestSelection},
    storage::LocalStorage,
    utils::http::HttpFetcher,
};

/// Meeting document harvester
#[derive(Parser, Debug)]
#[command(
    name = "meeting-harvester",
    version,
    about = "Harvests public meeting documents from event APIs and listing pages"
)]
struct Cli {
    /// Path to storage directory containing config.toml and harvested records
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest documents and merge them into the document store
    Harvest {
        /// Pipelines to run
        #[arg(long, value_enum, default_value_t = Source::All)]
        source: Source,
    },

    /// Validate configuration file
    Validate,

    /// Show document store info
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Source {
    /// Events API and listing pages
    All,
    /// Events API only
    Api,
    /// Listing pages only
    Listings,
}

impl From<Source> for HarvestSelection {
    fn from(source: Source) -> Self {
        match source {
            Source::All => HarvestSelection::All,
            Source::Api => HarvestSelection::Api,
            Source::Listings => HarvestSelection::Listings,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let storage = LocalStorage::new(&cli.storage_dir, config.storage.documents_file.as_str());

    match cli.command {
        Command::Harvest { source } => {
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            let fetcher = HttpFetcher::new(&config.crawler)?;
            let summary =
                pipeline::run_harvest(&config, &fetcher, &storage, source.into(), Utc::now())
                    .await?;

            if let Some(api) = &summary.api {
                log::info!(
                    "  events API: {} pages ({} failed), {} records",
                    api.pages,
                    api.failed_pages,
                    api.records
                );
            }
            if let Some(listings) = &summary.listings {
                log::info!(
                    "  listings: {} pages ({} failed), {} records, {} unresolved",
                    listings.pages,
                    listings.failed_pages,
                    listings.records,
                    listings.failed_documents
                );
            }
            log::info!(
                "Harvest took {}s",
                (summary.finished_at - summary.started_at).num_seconds()
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "Config OK ({} listing sources, {} link selectors)",
                config.listings.sources.len(),
                config.listings.link_selectors.len()
            );
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            match storage.load().await? {
                Some(stored) => {
                    log::info!("Document store: {}", storage.documents_path().display());
                    log::info!("Records: {}", stored.count);
                    log::info!("Last updated: {}", stored.updated_at);
                }
                None => log::info!("No documents harvested yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
