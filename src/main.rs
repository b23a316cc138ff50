use anyhow::{Context, Result};
use arxiv_harvest::config::{find_config_file, get_config, load_config, HarvestConfig};
use arxiv_harvest::harvest::{HarvestRequest, Harvester};
use arxiv_harvest::models::ResultCollection;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Keyword set used when neither the command line nor the config names any
const DEFAULT_KEYWORDS: [&str; 4] = ["all:TFET", "all:Tunnel FET", "all:TFETs", "all:Tunnel FETs"];

/// arXiv Harvest - Collect every arXiv search result for a keyword set
#[derive(Parser, Debug)]
#[command(name = "arxiv-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Harvest arXiv search results page by page into a JSON collection", long_about = None)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Keyword terms, OR-combined (e.g. "all:TFET" "ti:tunnel FET")
    keywords: Vec<String>,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Results per request
    #[arg(long, short = 'n')]
    page_size: Option<i64>,

    /// Offset of the first result
    #[arg(long)]
    start: Option<i64>,

    /// Stop after this many results instead of the feed's total
    #[arg(long)]
    total: Option<i64>,

    /// Seconds to wait after each request
    #[arg(long)]
    delay: Option<f64>,

    /// API endpoint
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the collection to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Cli {
    /// Overlay command-line values onto the loaded configuration
    fn apply(&self, config: &mut HarvestConfig) {
        if !self.keywords.is_empty() {
            config.keywords = self.keywords.clone();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(start) = self.start {
            config.start = start;
        }
        if let Some(total) = self.total {
            config.total = Some(total);
        }
        if let Some(delay) = self.delay {
            config.delay_seconds = delay;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if config.keywords.is_empty() {
            config.keywords = DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_harvest={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        get_config().context("Failed to read configuration from environment")?
    };
    cli.apply(&mut config);

    let harvester = Harvester::from_config(&config)?;

    let token = harvester.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            token.cancel();
        }
    });

    let request = HarvestRequest::from_config(&config);
    match harvester.harvest(&request).await {
        Ok(collection) => write_collection(&collection, cli.output.as_deref()),
        Err(failure) => {
            tracing::error!("{}", failure);
            if !failure.partial.is_empty() {
                tracing::warn!("Writing {} partial records", failure.partial.len());
                write_collection(&failure.partial, cli.output.as_deref())?;
            }
            Err(anyhow::Error::new(failure))
        }
    }
}

fn write_collection(collection: &ResultCollection, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(collection).context("Failed to serialize results")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} records to {}", collection.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
