//! Sprint Metrics - Jira sprint report summarizer
//!
//! A CLI tool that takes the ticket tables exported from a Jira sprint
//! report page, enriches every ticket through the Jira REST API, and
//! prints sprint metrics.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, sources file, Jira session, etc.)

mod analysis;
mod cli;
mod config;
mod jira;
mod models;
mod progress;
mod report;
mod sources;

use analysis::{AggregationConfig, AggregationEngine, ReferenceExtractor};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use jira::{JiraClient, JiraClientConfig};
use models::{CategorizedReferences, ReportMetadata, SprintReport};
use progress::ProgressBarSink;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Sprint Metrics v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", redacted(&args));

    match run_metrics(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sprint-metrics.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Set jira.base_url and adjust allowed types or category labels.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so the report on stdout stays pipeable.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Copy of the arguments safe to log.
fn redacted(args: &Args) -> Args {
    let mut args = args.clone();
    if args.api_token.is_some() {
        args.api_token = Some("***".to_string());
    }
    args
}

/// Run the complete metrics workflow. Returns the exit code.
async fn run_metrics(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate(!args.dry_run)?;

    let Some(ref sources_path) = args.sources else {
        bail!("--sources is required");
    };

    // Step 1: Make sure Jira will answer before touching the report
    let client = if args.dry_run {
        None
    } else {
        let client = JiraClient::new(JiraClientConfig::from(&config.jira))?;
        if args.skip_session_check {
            debug!("Skipping Jira session check");
        } else if !client.check_session().await {
            bail!(
                "Not logged into Jira at {}. Check --user and --api-token.",
                client.base_url()
            );
        } else {
            info!("Jira session is valid");
        }
        Some(client)
    };

    // Step 2: Extract ticket references
    let sources = sources::load_sources(sources_path)?;
    let sprint_name = sources.resolve_sprint_name(args.sprint.as_deref());
    let extractor = ReferenceExtractor::new(config.extraction.marker);
    let references = extractor.extract(&sources);

    info!(
        "Found {} ticket references in {} categories for sprint '{}'",
        references.total_references(),
        sources.categories.len(),
        sprint_name
    );

    let Some(client) = client else {
        return handle_dry_run(&references, &sprint_name);
    };

    if references.is_empty() {
        warn!("No ticket references found in {}", sources_path.display());
    }

    // Step 3: Enrich and aggregate
    let engine = AggregationEngine::new(AggregationConfig::from(&config.aggregation));
    let mut progress = ProgressBarSink::new(references.total_references(), !args.quiet);
    let outcome = engine
        .run(&references, &sprint_name, &client, &mut progress)
        .await;
    progress.finish();

    // Step 4: Build and emit the report
    let report = SprintReport {
        metadata: ReportMetadata {
            sprint_name: sprint_name.clone(),
            jira_url: client.base_url().to_string(),
            generated_at: Utc::now(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        metrics: outcome.metrics,
        tickets: outcome.tickets,
    };

    let output = report::render(&report, config.report.format)?;
    println!("{}", output);

    if let Some(ref path) = config.report.output {
        std::fs::write(path, &output)
            .with_context(|| format!("Failed to write report to {}", path))?;
        info!("Report saved to {}", path);
    }

    Ok(0)
}

/// Handle --dry-run: list extracted references, make no Jira calls.
fn handle_dry_run(references: &CategorizedReferences, sprint_name: &str) -> Result<i32> {
    println!("🔍 Dry run for sprint [{}] (no Jira calls)\n", sprint_name);

    for (label, set) in references.iter() {
        println!("   {} ({} tickets)", label, set.len());
        for reference in set.iter() {
            let marker = if reference.added_after_start {
                " (added after sprint start)"
            } else {
                ""
            };
            println!("     🎫 {}{}", reference.id, marker);
        }
    }

    println!(
        "\n   Total: {} references, {} added after sprint start",
        references.total_references(),
        references.added_after_start_count()
    );
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
