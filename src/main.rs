//! Visual Estimator - effort ranges for objective/ticket dependency graphs
//!
//! A CLI tool that fetches a portfolio of objectives and tickets, applies
//! per-ticket risk multipliers and reports best/worst-case point and sprint
//! ranges for every objective.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, fetch failure, invalid graph, etc.)

mod analysis;
mod cli;
mod config;
mod estimate;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use estimate::{compute_estimates, EstimateOptions};
use models::{Report, ReportMetadata};
use source::{FileSource, GraphSource, GraphqlSource};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Visual Estimator v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Estimation failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .estimator.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the endpoint, sprint capacity and report format.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
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

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Fetch the graph, compute the estimates and write the report.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let source = build_source(&config, !args.quiet)?;
    let graph = source
        .fetch()
        .await
        .with_context(|| format!("Failed to load graph from {}", source.describe()))?;
    info!(
        "Loaded {} nodes and {} edges from {}",
        graph.nodes.len(),
        graph.edges.len(),
        source.describe()
    );

    let options = EstimateOptions::from(&config.estimate);
    let estimated = compute_estimates(&graph, &options).context("Failed to compute estimates")?;

    let objectives: Vec<_> = analysis::filter_objectives(&estimated, &args.objectives)
        .into_iter()
        .cloned()
        .collect();
    let tickets: Vec<_> = analysis::filter_tickets(&estimated, &args.tickets)
        .into_iter()
        .cloned()
        .collect();
    debug!(
        "{} objectives and {} tickets match the filters",
        objectives.len(),
        tickets.len()
    );

    let report = Report {
        metadata: ReportMetadata {
            source: source.describe(),
            generated_at: Utc::now(),
            points_per_sprint: options.points_per_sprint,
            counting: options.counting,
            objective_query: args.objective_query().map(String::from),
            ticket_query: args.ticket_query().map(String::from),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        summary: analysis::summarize(&estimated, options.points_per_sprint),
        objectives,
        tickets,
    };

    let output = match config.report.format {
        OutputFormat::Markdown => report::generate_markdown_report(&report, &estimated),
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Text => report::generate_text_report(&report),
    };

    match config.report.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;

            if !args.quiet {
                println!(
                    "📊 Estimated {} objectives and {} tickets",
                    report.summary.objectives, report.summary.tickets
                );
                println!("✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Pick the graph source: a local file wins over the endpoint.
fn build_source(config: &Config, show_progress: bool) -> Result<Box<dyn GraphSource>> {
    if let Some(ref input) = config.source.input {
        return Ok(Box::new(FileSource::new(input)));
    }

    let source = GraphqlSource::new(
        config.source.endpoint.clone(),
        config.source.role.clone(),
        config.source.timeout_seconds,
        show_progress,
    )
    .context("Failed to create HTTP client")?;
    Ok(Box::new(source))
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
            info!("Loaded default config from {}", CONFIG_FILE);
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
