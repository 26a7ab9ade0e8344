//! Onion-Scout main entry point
//!
//! This is the command-line interface for an Onion-Scout worker.

use anyhow::Context;
use clap::Parser;
use onion_scout::config::{load_config_with_hash, Config};
use onion_scout::output::{build_sink, load_statistics, print_statistics};
use onion_scout::storage::{open_storage, SqliteStorage};
use onion_scout::tasks::{CrawlTaskAdapter, Launcher, Sweeper};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Onion-Scout: a distributed onion service crawler
///
/// Each worker claims the next eligible domain from the shared task
/// database, crawls it through a proxy, and reports page data to the
/// storage service. Domains discovered along the way become new tasks.
#[derive(Parser, Debug)]
#[command(name = "onion-scout")]
#[command(version = "1.0.0")]
#[command(about = "A distributed onion service crawler", long_about = None)]
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

    /// Crawl a single task and exit
    #[arg(long, conflicts_with_all = ["sweep", "stats", "dry_run"])]
    once: bool,

    /// Run the reconciliation and cooldown sweeps once and exit
    #[arg(long, conflicts_with_all = ["stats", "dry_run"])]
    sweep: bool,

    /// Show task statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Validate config and show the worker settings without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.sweep {
        handle_sweep(&config)?;
    } else {
        handle_worker(config, cli.once).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("onion_scout=info,warn"),
            1 => EnvFilter::new("onion_scout=debug,info"),
            2 => EnvFilter::new("onion_scout=trace,debug"),
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

fn open_shared_storage(config: &Config) -> anyhow::Result<Arc<Mutex<SqliteStorage>>> {
    let path = Path::new(&config.storage.database_path);
    let storage = open_storage(path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    Ok(Arc::new(Mutex::new(storage)))
}

fn job_stale_after(config: &Config) -> chrono::Duration {
    chrono::Duration::seconds(config.worker.job_stale_secs as i64)
}

/// Handles the --dry-run mode: shows what the worker would use
fn handle_dry_run(config: &Config) {
    println!("=== Onion-Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max requests per batch: {}", config.crawler.max_requests);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Timeout: {}s (+{}s per connect timeout, up to {}s)",
        config.crawler.timeout_secs,
        config.crawler.timeout_step_secs,
        config.crawler.timeout_ceiling_secs
    );
    match config.crawler.max_run_secs {
        Some(secs) => println!("  Run deadline: {}s", secs),
        None => println!("  Run deadline: none"),
    }
    println!("  Favicon probe: {}", config.crawler.probe_favicon);

    println!("\nNetwork:");
    println!("  User agents: {}", config.network.user_agents.len());
    println!("  Proxies: {}", config.network.proxies.len());
    for proxy in &config.network.proxies {
        println!("    * {}", proxy);
    }
    println!("  Direct connections allowed: {}", config.network.allow_direct);

    println!("\nReporting:");
    match &config.api {
        Some(api) => println!("  Storage service: {}", api.base_url),
        None => println!("  Storage service: none (results are logged)"),
    }
    println!("  Task database: {}", config.storage.database_path);

    println!("\nSeed Domains ({}):", config.seed.len());
    for seed in &config.seed {
        println!(
            "  - {} (importance {}, every {} day(s))",
            seed.domain, seed.importance, seed.frequency
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows task statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --sweep mode: one reconciliation and cooldown pass
fn handle_sweep(config: &Config) -> anyhow::Result<()> {
    let storage = open_shared_storage(config)?;
    let report = Sweeper::new(storage, job_stale_after(config)).run(chrono::Utc::now())?;

    println!(
        "Reclaimed {} task(s), reactivated {} task(s), pruned {} stale job(s)",
        report.reclaimed, report.reactivated, report.pruned_jobs
    );
    Ok(())
}

/// Handles the worker loop: claim, crawl, repeat
async fn handle_worker(config: Config, once: bool) -> anyhow::Result<()> {
    let storage = open_shared_storage(&config)?;

    let adapter = CrawlTaskAdapter::new(Arc::clone(&storage));
    for seed in &config.seed {
        adapter.ensure_task(&seed.domain, seed.importance, seed.frequency)?;
    }
    tracing::info!("Registered {} seed domain(s)", config.seed.len());

    let sink = build_sink(config.api.as_ref())?;
    let launcher = Launcher::new(Arc::clone(&storage), sink, &config);
    let sweeper = Sweeper::new(Arc::clone(&storage), job_stale_after(&config));

    let sweep_interval = Duration::from_secs(config.worker.sweep_interval_secs);
    let idle_backoff = Duration::from_secs(config.worker.idle_backoff_secs);
    let mut last_sweep: Option<Instant> = None;

    loop {
        if last_sweep.map_or(true, |at| at.elapsed() >= sweep_interval) {
            if let Err(e) = sweeper.run(chrono::Utc::now()) {
                tracing::error!("Sweep failed: {}", e);
            }
            last_sweep = Some(Instant::now());
        }

        let outcome = tokio::select! {
            outcome = launcher.launch() => outcome,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted; the running task will be reclaimed by a later sweep");
                return Ok(());
            }
        };

        match outcome {
            Ok(summary) => tracing::info!(
                "Finished {}: {} pages, {} new domains",
                summary.domain,
                summary.pages_crawled,
                summary.external_domains_found
            ),
            Err(e) if e.is_exhaustion() => {
                if once {
                    tracing::info!("Nothing to do: {}", e);
                    return Ok(());
                }
                tracing::info!("{}; retrying in {}s", e, idle_backoff.as_secs());
                tokio::select! {
                    _ = tokio::time::sleep(idle_backoff) => {}
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupted, shutting down");
                        return Ok(());
                    }
                }
                continue;
            }
            // The launcher already recorded the task as FAILED
            Err(e) => tracing::error!("Crawl failed: {}", e),
        }

        if once {
            return Ok(());
        }
    }
}
