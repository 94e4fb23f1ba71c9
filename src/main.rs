//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest extracting crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_harvest::config::{default_config, load_config, validate, Config};
use sumi_harvest::crawler::Coordinator;
use sumi_harvest::output::print_summary;
use sumi_harvest::storage::{open_storage, RecordStore};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a bounded-concurrency extracting crawler
///
/// Sumi-Harvest crawls every page under ROOT_URL up to MAX_DEPTH links away,
/// extracts records from pages matching its rules and stores them in SQLite.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A bounded-concurrency extracting crawler", long_about = None)]
struct Cli {
    /// URL to start from; only URLs beginning with it are crawled
    #[arg(value_name = "ROOT_URL")]
    root_url: Option<String>,

    /// Maximum link depth to follow from the root
    #[arg(value_name = "MAX_DEPTH")]
    max_depth: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show how many records the database holds and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (or the defaults), then applies positional overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => default_config(),
    };

    if let Some(root_url) = &cli.root_url {
        config.crawler.root_url = root_url.clone();
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Root URL: {}", config.crawler.root_url);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max in flight: {}", config.crawler.max_in_flight);
    println!("  Poll interval: {}ms", config.crawler.poll_interval_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Commit every: {} records", config.output.commit_every);

    println!("\nExtraction Rules ({}):", config.rules.len());
    for rule in &config.rules {
        let fields: Vec<&str> = rule.fields.keys().map(String::as_str).collect();
        println!("  - {}", rule.pattern);
        println!("    fields: {}", fields.join(", "));
        if !rule.required.is_empty() {
            println!("    required: {}", rule.required.join(", "));
        }
        if let Some(child) = &rule.child_selector {
            println!("    follows: {}", child);
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: counts stored records
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = Path::new(&config.output.database_path);
    let storage = open_storage(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;

    println!("Database: {}", path.display());
    println!("Records: {}", storage.count_records()?);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Extraction rules: {}, database: {}",
        config.rules.len(),
        config.output.database_path
    );

    let mut coordinator = Coordinator::new(config).context("failed to start crawl")?;

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });

    let summary = coordinator.run().await.context("crawl failed")?;
    print_summary(&summary);

    Ok(())
}
