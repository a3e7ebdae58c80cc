//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::CountingPolicy;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Estimator - point and sprint ranges for objective/ticket dependency graphs
///
/// Fetches the portfolio graph, applies per-ticket risk multipliers and
/// reports best/worst-case points and sprints for every objective, both for
/// its direct tickets and for its whole dependency closure.
///
/// Examples:
///   estimator
///   estimator --input fixtures/portfolio.json --points-per-sprint 20
///   estimator --endpoint http://localhost:8080/v1/graphql --format json -o estimates.json
///   estimator --objectives checkout --tickets api
///   estimator --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Read the graph from a JSON file instead of the GraphQL endpoint
    ///
    /// Accepts either a saved GraphQL response or a bare {"nodes", "edges"} payload.
    /// Takes precedence over --endpoint.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// GraphQL endpoint serving the overview query
    #[arg(short, long, value_name = "URL", env = "ESTIMATOR_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Role sent in the X-Hasura-Role header
    #[arg(long, value_name = "ROLE")]
    pub role: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Team capacity used to convert points into sprints
    ///
    /// Default: from config or 16.
    #[arg(
        short,
        long,
        value_name = "POINTS",
        env = "ESTIMATOR_POINTS_PER_SPRINT"
    )]
    pub points_per_sprint: Option<f64>,

    /// How a ticket reached through several paths is counted
    ///
    /// Default: from config or per-path. Use distinct for graphs with cycles.
    #[arg(long, value_name = "POLICY")]
    pub counting: Option<CountingPolicy>,

    /// Abort when a single traversal pops more than this many edges
    #[arg(long, value_name = "STEPS")]
    pub max_steps: Option<usize>,

    /// Aggregate objectives in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Only list objectives whose name contains this text (case-insensitive)
    #[arg(long, value_name = "QUERY", default_value = "")]
    pub objectives: String,

    /// Only list tickets whose name contains this text (case-insensitive)
    #[arg(long, value_name = "QUERY", default_value = "")]
    pub tickets: String,

    /// Output format (markdown, json, text)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .estimator.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .estimator.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown tables (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// Fixed-width plain text
    Text,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(points) = self.points_per_sprint {
            if !points.is_finite() || points <= 0.0 {
                return Err("Points per sprint must be a positive number".to_string());
            }
        }

        if self.max_steps == Some(0) {
            return Err("Max steps must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The objective filter, if one was given.
    pub fn objective_query(&self) -> Option<&str> {
        Some(self.objectives.trim()).filter(|q| !q.is_empty())
    }

    /// The ticket filter, if one was given.
    pub fn ticket_query(&self) -> Option<&str> {
        Some(self.tickets.trim()).filter(|q| !q.is_empty())
    }
}
