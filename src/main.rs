//! School Harvest main entry point
//!
//! This is the command-line interface for the school directory harvester.

use anyhow::{bail, Context};
use clap::Parser;
use school_harvest::config::{load_config_with_hash, Config};
use school_harvest::crawler::Harvester;
use school_harvest::output::{print_report, print_run_history, print_walk_summary};
use school_harvest::state::ProgressUpdate;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// School Harvest: an incremental school directory harvester
///
/// Walks each district's paginated listing pages into a base record list,
/// then enriches every record from its detail page. Progress is checkpointed
/// and interrupted runs resume where they stopped.
#[derive(Parser, Debug)]
#[command(name = "school-harvest")]
#[command(version)]
#[command(about = "An incremental school directory harvester", long_about = None)]
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

    /// Build the group list from a saved group index page and exit
    #[arg(long, value_name = "HTML", conflicts_with_all = ["walk_only", "enrich_only", "report", "dry_run"])]
    discover: Option<PathBuf>,

    /// Extract one school detail page (URL or saved HTML file) and exit
    #[arg(long, value_name = "URL|FILE", conflicts_with_all = ["discover", "walk_only", "enrich_only", "report", "dry_run"])]
    detail: Option<String>,

    /// Base URL for relative links in the page given to --discover
    #[arg(long, value_name = "URL", requires = "discover")]
    base_url: Option<String>,

    /// Only walk listing pages into the base record list
    #[arg(long, conflicts_with_all = ["enrich_only", "report", "dry_run"])]
    walk_only: bool,

    /// Only enrich existing records
    #[arg(long, conflicts_with_all = ["report", "dry_run"])]
    enrich_only: bool,

    /// Print the completion report for the records on disk and exit
    #[arg(long, conflicts_with = "dry_run")]
    report: bool,

    /// Validate config and show what would be done without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Ignore checkpoints and start from the walk (or the base list with --enrich-only)
    #[arg(long)]
    fresh: bool,

    /// First record index to enrich (overrides the config)
    #[arg(long, value_name = "N")]
    start: Option<usize>,

    /// Number of records to enrich (overrides the config)
    #[arg(long, value_name = "N")]
    count: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(start) = cli.start {
        config.enrichment.start_index = start;
    }
    if cli.count.is_some() {
        config.enrichment.count = cli.count;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let top_n = config.output.report_top_n;
    let (tx, rx) = mpsc::unbounded_channel();
    let mut harvester = Harvester::new(config)?
        .with_config_hash(config_hash)
        .with_progress_channel(tx);

    // Ctrl-C stops at the next record or group boundary; checkpoints are still written
    let stop = harvester.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current item and saving progress");
            stop.store(true, Ordering::SeqCst);
        }
    });
    tokio::spawn(log_progress(rx));

    if let Some(html_path) = &cli.discover {
        let groups = harvester.discover_groups(html_path, cli.base_url.as_deref())?;
        println!(
            "✓ {} groups written to {}",
            groups.len(),
            harvester.config().output.groups_path
        );
    } else if let Some(target) = &cli.detail {
        let fields = harvester.extract_single_detail(target).await?;
        for (key, value) in &fields {
            println!("{}: {}", key, value);
        }
        println!(
            "\n✓ {} fields written to {}",
            fields.len(),
            harvester.config().output.detail_path
        );
    } else if cli.report {
        handle_report(&harvester, top_n)?;
    } else if cli.walk_only {
        let summary = harvester.walk().await?;
        print_walk_summary(&summary);
    } else if cli.enrich_only {
        let mut records = harvester.resume_records(cli.fresh)?;
        if records.is_empty() {
            bail!(
                "no records to enrich in {}; run a walk first",
                harvester.config().output.records_path
            );
        }
        let run = harvester.enrich(&mut records).await?;
        let report = harvester.report(&records, Some(&run))?;
        print_report(&report, top_n);
    } else {
        if cli.fresh {
            tracing::info!("Starting fresh harvest (ignoring previous checkpoints)");
        }
        let report = harvester.run(cli.fresh).await?;
        print_report(&report, top_n);
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
            0 => EnvFilter::new("school_harvest=info,warn"),
            1 => EnvFilter::new("school_harvest=debug,info"),
            2 => EnvFilter::new("school_harvest=trace,debug"),
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

/// Logs a progress line every 10 processed records
async fn log_progress(mut rx: mpsc::UnboundedReceiver<ProgressUpdate>) {
    while let Some(update) = rx.recv().await {
        let progress = &update.progress;
        if progress.processed_count % 10 == 0 {
            tracing::info!(
                "Progress: {}/{} ({:.1}%), {} ok, {} failed, {} skipped",
                progress.processed_count,
                progress.range_len(),
                progress.percent_processed(),
                progress.success_count,
                progress.fail_count,
                progress.skip_count
            );
        }
    }
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== School Harvest Dry Run ===\n");

    println!("HTTP:");
    println!("  User agent: {}", config.user_agent.header_value());
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!(
        "  Retries: {} attempts, {}s apart",
        config.http.retry_attempts, config.http.retry_delay_secs
    );

    println!("\nWalker:");
    println!("  Page delay: {}s", config.walker.page_delay_secs);
    println!("  Group delay: {}s", config.walker.group_delay_secs);
    println!("  Save every {} groups", config.walker.save_interval);
    match config.walker.max_pages_per_group {
        Some(max) => println!("  Max pages per group: {}", max),
        None => println!("  Max pages per group: unlimited"),
    }

    println!("\nEnrichment:");
    println!("  Start index: {}", config.enrichment.start_index);
    match config.enrichment.count {
        Some(count) => println!("  Count: {}", count),
        None => println!("  Count: all remaining"),
    }
    println!("  Delay: {}s", config.enrichment.delay_secs);
    println!("  Checkpoint every {} records", config.enrichment.save_interval);
    println!(
        "  Enriched when any of: {}",
        config.enrichment.required_fields.join(", ")
    );

    println!("\nOutput:");
    println!("  Groups: {}", config.output.groups_path);
    println!("  Base records: {}", config.output.records_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Complete records: {}", config.output.complete_path);
    println!("  Single detail: {}", config.output.detail_path);
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }
    if let Some(path) = &config.output.database_path {
        println!("  Run ledger: {}", path);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --report mode: reports on the most complete record list on disk
fn handle_report(harvester: &Harvester, top_n: usize) -> anyhow::Result<()> {
    let records = harvester.latest_records()?;
    let report = harvester.report(&records, None)?;
    print_report(&report, top_n);

    if harvester.config().output.database_path.is_some() {
        println!();
        print_run_history(&harvester.run_history(10)?);
    }

    Ok(())
}
