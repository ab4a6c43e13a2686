//! podcrawl - podcast show crawler
//!
//! Scrapes a category page for show links, looks every show up in the
//! catalog concurrently and prints the resolved shows as JSON on stdout.
//! Failures are logged; they do not stop the other lookups.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use podcrawl::{LookupClient, PageLinkDiscovery, RequestOptions, ShowFetcher};
use podcrawl_common::config::ConfigResolver;
use tracing::{info, warn};

/// Command-line arguments for podcrawl
#[derive(Parser, Debug)]
#[command(name = "podcrawl")]
#[command(about = "Fetch podcast show metadata for a category page")]
#[command(version)]
struct Args {
    /// Category page listing the shows
    #[arg(short, long, env = "PODCRAWL_SOURCE_URL")]
    source_url: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lookup endpoint template (identifier is appended)
    #[arg(long)]
    endpoint: Option<String>,

    /// Maximum lookups in flight (0 = unbounded)
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;

    if let Some(endpoint) = args.endpoint {
        config.lookup.endpoint = endpoint;
    }
    if let Some(max_concurrent) = args.max_concurrent {
        config.lookup.max_concurrent = max_concurrent;
    }

    podcrawl_common::logging::init_tracing(&config.logging)
        .context("Failed to initialize logging")?;

    info!("Starting podcrawl v{}", env!("CARGO_PKG_VERSION"));
    info!("Source: {}", args.source_url);
    info!("Lookup endpoint: {}", config.lookup.endpoint);

    let discovery =
        PageLinkDiscovery::new(&config.lookup).context("Failed to create discovery client")?;
    let resolver = LookupClient::new(&config.lookup).context("Failed to create lookup client")?;

    let fetcher = ShowFetcher::new(Arc::new(resolver))
        .with_max_concurrency(config.lookup.concurrency_limit());
    let options = Arc::new(RequestOptions::from_config(&config, args.source_url));

    let outcome = fetcher.get_shows(&discovery, options).await;

    for error in &outcome.errors {
        warn!(id = ?error.identifier(), "{}", error);
    }

    let json = match args.pretty {
        true => serde_json::to_string_pretty(&outcome.shows),
        false => serde_json::to_string(&outcome.shows),
    };
    println!("{}", json.context("Failed to serialize shows")?);

    info!(
        shows = outcome.shows.len(),
        failures = outcome.errors.len(),
        "Done"
    );

    if outcome.shows.is_empty() && !outcome.errors.is_empty() {
        anyhow::bail!("No shows fetched ({} failures)", outcome.errors.len());
    }

    Ok(())
}
