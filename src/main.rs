//! xf-mirror main entry point
//!
//! This is the command-line interface for the xf-mirror thread follower.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;
use xf_mirror::config::{load_config_with_hash, Config, DeliveryKind};
use xf_mirror::crawler::{Controller, HttpPageFetcher, PageFetcher};
use xf_mirror::delivery::{build_sink, message_format, MessageSink};
use xf_mirror::state::ThreadWatermark;
use xf_mirror::storage::{open_storage, PassLog, SqliteStorage, StorageError, WatermarkStore};
use xf_mirror::ThreadRef;

/// xf-mirror: follow forum threads and republish new posts
///
/// xf-mirror polls one or more XenForo threads, remembers how far it has read
/// each of them, and publishes every newly appeared post to a Telegram chat
/// (or stdout).
#[derive(Parser, Debug)]
#[command(name = "xf-mirror")]
#[command(version = "1.0.0")]
#[command(about = "Mirror new forum thread posts to a message channel", long_about = None)]
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

    /// Run a single round over all threads and exit
    #[arg(long, conflicts_with_all = ["dry_run", "status"])]
    once: bool,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with_all = ["once", "status"])]
    dry_run: bool,

    /// Show stored watermarks and the latest pass of each thread, then exit
    #[arg(long, conflicts_with_all = ["once", "dry_run"])]
    status: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.status {
        handle_status(&config)
    } else {
        handle_mirror(&config, cli.once).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("xf_mirror=info,warn"),
            1 => EnvFilter::new("xf_mirror=debug,info"),
            2 => EnvFilter::new("xf_mirror=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== xf-mirror Dry Run ===\n");

    let base_url = config.base_url()?;
    println!("Forum: {}", base_url);

    println!("\nCrawler:");
    println!("  Request pause: {}ms", config.crawler.request_pause_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Interval: {}s", config.crawler.interval_secs);

    println!("\nUser Agent:");
    println!(
        "  {}",
        xf_mirror::crawler::user_agent_string(&config.user_agent)
    );

    println!("\nDelivery:");
    match config.delivery.kind {
        DeliveryKind::Telegram => println!(
            "  Telegram chat {} via {}",
            config.delivery.chat_id.as_deref().unwrap_or("-"),
            config.delivery.api_base
        ),
        DeliveryKind::Stdout => println!("  stdout"),
    }
    println!("  Excerpt: {} chars", config.delivery.excerpt_chars);

    // Only read existing state; a dry run must not create the database
    let db_path = Path::new(&config.storage.database_path);
    let storage = if db_path.exists() {
        Some(open_storage(db_path)?)
    } else {
        None
    };

    let threads = config.thread_refs()?;
    println!("\nThreads ({}):", threads.len());
    for thread in &threads {
        let watermark = match &storage {
            Some(storage) => lookup_watermark(storage, thread.id())?,
            None => None,
        };
        let watermark = watermark.unwrap_or_else(|| ThreadWatermark::initial(thread.id()));
        println!(
            "  - {} (id {}): page {}, last post {}",
            thread, thread.id(), watermark.last_page, watermark.last_post_id
        );
        println!(
            "    next fetch: {}",
            thread.page_url(&base_url, watermark.last_page)?
        );
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --status mode: shows watermarks and pass history
fn handle_status(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let watermarks = storage.list()?;

    if watermarks.is_empty() {
        println!("No threads have been crawled yet");
        return Ok(());
    }

    for watermark in &watermarks {
        println!(
            "Thread {}: page {}, last post {} ({} passes)",
            watermark.thread_id,
            watermark.last_page,
            watermark.last_post_id,
            storage.count_passes(watermark.thread_id)?
        );
        match storage.latest_pass(watermark.thread_id)? {
            Some(pass) => {
                println!(
                    "  latest pass: {} at {} ({} new posts, {} pages)",
                    pass.status, pass.finished_at, pass.new_posts, pass.pages_fetched
                );
                if let Some(message) = pass.error_message {
                    println!("  error: {}", message);
                }
            }
            None => println!("  latest pass: none"),
        }
    }

    Ok(())
}

/// Runs rounds at startup and then on the configured interval
async fn handle_mirror(config: &Config, once: bool) -> anyhow::Result<()> {
    let threads = config.thread_refs()?;
    let storage = open_storage(Path::new(&config.storage.database_path))
        .with_context(|| format!("Cannot open {}", config.storage.database_path))?;
    let fetcher = HttpPageFetcher::from_config(config)?;
    let sink = build_sink(config)?;

    tracing::info!(
        "Following {} thread(s) on {}, delivering via {}",
        threads.len(),
        fetcher.base_url(),
        sink.name()
    );

    let mut controller = Controller::new(storage, fetcher).with_format(message_format(config));

    if once {
        run_round(&mut controller, &threads, sink.as_ref()).await;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.crawler.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_round(&mut controller, &threads, sink.as_ref()).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Runs one pass per thread, sequentially; failures do not stop the round
async fn run_round<F: PageFetcher>(
    controller: &mut Controller<SqliteStorage, F>,
    threads: &[ThreadRef],
    sink: &dyn MessageSink,
) {
    let mut delivered = 0;
    let mut failed_passes = 0;

    for thread in threads {
        match controller.run_pass(thread, sink).await {
            Ok(report) => delivered += report.delivered,
            Err(e) => {
                failed_passes += 1;
                if e.is_store_unavailable() {
                    tracing::error!("State store unavailable, retrying next round: {}", e);
                }
            }
        }
    }

    tracing::info!(
        "Round finished: {} posts delivered, {}/{} passes failed",
        delivered,
        failed_passes,
        threads.len()
    );
}

fn lookup_watermark(
    storage: &SqliteStorage,
    thread_id: i64,
) -> anyhow::Result<Option<ThreadWatermark>> {
    match storage.get(thread_id) {
        Ok(watermark) => Ok(Some(watermark)),
        Err(StorageError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
