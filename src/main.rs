//! Paged-Harvest main entry point
//!
//! This is the command-line interface for the Paged-Harvest collection fetcher.

use anyhow::Context;
use clap::Parser;
use paged_harvest::config::{load_config_with_hash, validate, Config};
use paged_harvest::crawler::{crawl, CrawlInput};
use paged_harvest::output::{print_report, FailureLedger};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Paged-Harvest: a rate-limit aware collection fetcher
///
/// Fetches every page of each configured endpoint, stores each collection as
/// one JSON file, and retries failed endpoints in rounds. Endpoints still
/// failing at the end are listed in a JSON failure ledger.
#[derive(Parser, Debug)]
#[command(name = "paged-harvest")]
#[command(version)]
#[command(about = "A rate-limit aware collection fetcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Credential to use instead of the configured tokens (repeatable)
    #[arg(long = "token", value_name = "TOKEN")]
    tokens: Vec<String>,

    /// Override the number of targets fetched at the same time
    #[arg(long)]
    concurrency: Option<u32>,

    /// Override the maximum number of rounds
    #[arg(long)]
    retries: Option<u32>,

    /// Indent artifacts for human readers
    #[arg(long)]
    pretty: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with = "show_ledger")]
    dry_run: bool,

    /// Print the failure ledger left by the previous run and exit
    #[arg(long, conflicts_with = "dry_run")]
    show_ledger: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.show_ledger {
        handle_show_ledger(Path::new(&config.output.log_path))
    } else {
        handle_crawl(&config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paged_harvest=info,warn"),
            1 => EnvFilter::new("paged_harvest=debug,info"),
            2 => EnvFilter::new("paged_harvest=trace,debug"),
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

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if !cli.tokens.is_empty() {
        config.credentials.tokens = cli.tokens.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawler.concurrency = concurrency;
    }
    if let Some(retries) = cli.retries {
        config.crawler.max_retries = retries;
    }
    if cli.pretty {
        config.output.pretty_json = true;
    }

    validate(config).context("invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: validates input and lists the targets
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let input = CrawlInput::from_config(config);
    let validated = input.validate()?;
    let pool_size = config.credentials.tokens.len();
    let targets = validated.into_targets(Path::new(&config.output.directory));

    println!("=== Paged-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max rounds: {}", config.crawler.max_retries);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Request timeout: {}s", config.crawler.request_timeout);

    println!("\nAPI:");
    println!("  Items per page: {}", config.api.per_page);
    println!("  Auth scheme: {}", config.api.auth_scheme);
    println!(
        "  Rate-limit headers: {} / {}",
        config.api.remaining_header, config.api.reset_header
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Ledger: {}", config.output.log_path);
    println!("  Pretty JSON: {}", config.output.pretty_json);

    println!("\nTargets ({}, {} credentials):", targets.len(), pool_size);
    for (index, target) in targets.iter().enumerate() {
        let status = if target.artifact_path.exists() {
            "exists, will skip"
        } else {
            "pending"
        };
        println!(
            "  - {} -> {} [credential #{}] ({})",
            target.url,
            target.artifact_path.display(),
            index % pool_size,
            status
        );
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --show-ledger mode: prints the previous run's failures
fn handle_show_ledger(path: &Path) -> anyhow::Result<()> {
    let ledger = FailureLedger::read(path)
        .with_context(|| format!("failed to read ledger {}", path.display()))?;

    if ledger.is_empty() {
        println!("No unresolved targets in {}", path.display());
        return Ok(());
    }

    println!("{} unresolved targets in {}:", ledger.len(), path.display());
    for entry in ledger.entries() {
        println!("  - {} ({})", entry.url(), entry.reason());
    }
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    tracing::info!(
        "Targets: {}, credentials: {}, max rounds: {}, concurrency: {}",
        config.targets.urls.len(),
        config.credentials.tokens.len(),
        config.crawler.max_retries,
        config.crawler.concurrency
    );

    match crawl(config).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
