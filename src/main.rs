//! Kumo-Frontier main entry point
//!
//! This is the command-line interface for preparing, resuming, and
//! inspecting a frontier database.

use clap::Parser;
use kumo_frontier::checkpoint::CheckpointJournal;
use kumo_frontier::config::load_config_with_hash;
use kumo_frontier::storage::{RunStatus, SqliteStorage, Storage};
use kumo_frontier::{Frontier, FrontierError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Kumo-Frontier: a polite, crash-safe crawl frontier
///
/// Kumo-Frontier manages the scheduling core of a web crawl: which URI is
/// fetched next, per-host politeness, work-queue fairness, and checkpoint
/// recovery. Fetching and link extraction are external collaborators that
/// attach through the library API.
#[derive(Parser, Debug)]
#[command(name = "kumo-frontier")]
#[command(version = "1.0.0")]
#[command(about = "A polite, crash-safe crawl frontier", long_about = None)]
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

    /// Resume from the latest checkpoint (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start fresh, ignoring any previous checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show what would be seeded without touching the database
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show frontier statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_prepare(config, config_hash, cli.fresh)?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kumo_frontier=info,warn"),
            1 => EnvFilter::new("kumo_frontier=debug,info"),
            2 => EnvFilter::new("kumo_frontier=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be seeded
fn handle_dry_run(
    config: &kumo_frontier::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Kumo-Frontier Dry Run ===\n");

    println!("Frontier Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.frontier.max_concurrent_fetches
    );
    println!("  Per-queue concurrency: {}", config.frontier.queue_concurrency);
    println!("  Max fetch attempts: {}", config.frontier.max_attempts);
    if config.frontier.checkpoint_every > 0 {
        println!(
            "  Checkpoint every: {} completed records",
            config.frontier.checkpoint_every
        );
    }

    println!("\nPoliteness:");
    println!("  Minimum delay: {}ms", config.politeness.min_delay_ms);
    println!("  Maximum delay: {}ms", config.politeness.max_delay_ms);
    println!("  Delay factor: {}", config.politeness.delay_factor);

    println!("\nBudgets:");
    match config.budget.max_uris {
        Some(n) => println!("  Max URIs: {}", n),
        None => println!("  Max URIs: unlimited"),
    }
    match config.budget.max_bytes {
        Some(n) => println!("  Max bytes: {}", n),
        None => println!("  Max bytes: unlimited"),
    }
    match config.budget.max_queue_uris {
        Some(n) => println!("  Max URIs per queue: {}", n),
        None => println!("  Max URIs per queue: unlimited"),
    }
    match config.budget.max_crawl_seconds {
        Some(n) => println!("  Max crawl time: {}s", n),
        None => println!("  Max crawl time: unlimited"),
    }

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!("  Snapshots kept: {}", config.storage.snapshots_to_keep);

    println!("\nSeeds ({}):", config.frontier.seeds.len());
    for seed in &config.frontier.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would seed the frontier with {} URIs",
        config.frontier.seeds.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows frontier statistics from the database
fn handle_stats(config: &kumo_frontier::Config) -> Result<(), Box<dyn std::error::Error>> {
    use std::path::Path;

    println!("Database: {}\n", config.storage.database_path);

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

    match storage.get_latest_run()? {
        Some(run) => {
            println!("Latest run: #{}", run.id);
            println!("  Started: {}", run.started_at);
            match &run.finished_at {
                Some(finished) => println!("  Finished: {}", finished),
                None => println!("  Finished: (still open)"),
            }
            println!("  Status: {}", run.status.to_db_string());
            println!("  Config hash: {}", run.config_hash);
        }
        None => println!("No runs recorded"),
    }

    let snapshots = storage.list_snapshots()?;
    println!("\nSnapshots ({}):", snapshots.len());
    for (id, created_at) in &snapshots {
        println!("  #{} at {}", id, created_at);
    }

    if let Some(id) = storage.latest_snapshot_id()? {
        if let Some(snapshot) = storage.load_snapshot(id)? {
            let pending: usize = snapshot.queues.iter().map(|q| q.records.len()).sum();
            let retired = snapshot.queues.iter().filter(|q| q.retired).count();
            println!("\nLatest snapshot (#{}):", id);
            println!("  Queues: {} ({} retired)", snapshot.queues.len(), retired);
            println!("  Pending records: {}", pending);
            println!("  Seen fingerprints: {}", snapshot.seen.len());
            println!("  URIs admitted: {}", snapshot.budget.uris_admitted);
            println!("  Bytes fetched: {}", snapshot.budget.bytes_fetched);
        }
    }

    Ok(())
}

/// Handles the default mode: prepares a fresh or resumed frontier database
fn handle_prepare(
    config: kumo_frontier::Config,
    config_hash: String,
    fresh: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::path::Path;

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let snapshots_to_keep = config.storage.snapshots_to_keep;
    let seeds = config.frontier.seeds.clone();

    let mut journal = CheckpointJournal::new(Box::new(storage), snapshots_to_keep);
    let run_id = journal.create_run(&config_hash)?;

    let frontier = if fresh {
        tracing::info!("Starting fresh frontier (ignoring previous checkpoints)");
        Frontier::new(config)
    } else {
        match journal.recover(config.clone(), &config_hash) {
            Ok(Some(frontier)) => {
                tracing::info!("Resumed frontier from latest checkpoint");
                frontier
            }
            Ok(None) => {
                tracing::info!("No checkpoint found, starting fresh frontier");
                Frontier::new(config)
            }
            Err(e @ FrontierError::ConfigMismatch { .. }) => {
                tracing::error!("{}", e);
                tracing::error!("Pass --fresh to discard the checkpointed state");
                journal.mark_run(run_id, RunStatus::Failed)?;
                return Err(e.into());
            }
            Err(e) => {
                journal.mark_run(run_id, RunStatus::Failed)?;
                return Err(e.into());
            }
        }
    };

    let mut seeded = 0;
    for seed in &seeds {
        match frontier.add_seed(seed) {
            Ok(kumo_frontier::SubmitOutcome::Admitted) => seeded += 1,
            Ok(outcome) => tracing::debug!("Seed {} not admitted: {:?}", seed, outcome),
            Err(e) => tracing::warn!("Seed {} rejected: {}", seed, e),
        }
    }
    tracing::info!("Seeded {} new URIs", seeded);

    let snapshot_id = journal.checkpoint(&frontier, &config_hash)?;
    journal.complete_run(run_id)?;

    let status = frontier.status();
    println!("Frontier ready (snapshot #{})", snapshot_id);
    println!("  Queues: {}", status.queue_count);
    println!("  Pending records: {}", status.queued_count);
    println!("  URIs admitted: {}", status.admitted_count);

    Ok(())
}
