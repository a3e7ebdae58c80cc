//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.estimator.toml` files.

use crate::cli::OutputFormat;
use crate::estimate::EstimateOptions;
use crate::models::CountingPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".estimator.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Graph source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Estimation settings.
    #[serde(default)]
    pub estimate: EstimateConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where the graph is fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// GraphQL endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Value of the `X-Hasura-Role` request header.
    #[serde(default = "default_role")]
    pub role: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Local JSON file used instead of the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            role: default_role(),
            timeout_seconds: default_timeout(),
            input: None,
        }
    }
}

fn default_endpoint() -> String {
    "https://visual-estimator.herokuapp.com/v1/graphql".to_string()
}

fn default_role() -> String {
    "app".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateConfig {
    /// Team capacity in points per sprint.
    #[serde(default = "default_points_per_sprint")]
    pub points_per_sprint: f64,

    /// How tickets reached through several paths are counted.
    #[serde(default)]
    pub counting: CountingPolicy,

    /// Per-walk traversal step budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,

    /// Aggregate objectives in parallel.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            points_per_sprint: default_points_per_sprint(),
            counting: CountingPolicy::default(),
            max_steps: None,
            parallel: false,
        }
    }
}

fn default_points_per_sprint() -> f64 {
    16.0
}

impl From<&EstimateConfig> for EstimateOptions {
    fn from(config: &EstimateConfig) -> Self {
        Self {
            points_per_sprint: config.points_per_sprint,
            counting: config.counting,
            max_steps: config.max_steps,
            parallel: config.parallel,
        }
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file; stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.estimator.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref endpoint) = args.endpoint {
            self.source.endpoint = endpoint.clone();
        }
        if let Some(ref role) = args.role {
            self.source.role = role.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if let Some(ref input) = args.input {
            self.source.input = Some(input.clone());
        }

        if let Some(points) = args.points_per_sprint {
            self.estimate.points_per_sprint = points;
        }
        if let Some(counting) = args.counting {
            self.estimate.counting = counting;
        }
        if let Some(max_steps) = args.max_steps {
            self.estimate.max_steps = Some(max_steps);
        }
        if args.parallel {
            self.estimate.parallel = true;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref output) = args.output {
            self.report.output = Some(output.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.role, "app");
        assert_eq!(config.estimate.points_per_sprint, 16.0);
        assert_eq!(config.estimate.counting, CountingPolicy::PerPath);
        assert_eq!(config.report.format, OutputFormat::Markdown);
        assert!(config.report.output.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[source]
endpoint = "http://localhost:8080/v1/graphql"
role = "planner"

[estimate]
points_per_sprint = 21.0
counting = "distinct"
max_steps = 5000
parallel = true

[report]
format = "json"
output = "estimates.json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.source.endpoint, "http://localhost:8080/v1/graphql");
        assert_eq!(config.source.role, "planner");
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.estimate.points_per_sprint, 21.0);
        assert_eq!(config.estimate.counting, CountingPolicy::Distinct);
        assert_eq!(config.estimate.max_steps, Some(5000));
        assert!(config.estimate.parallel);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.output, Some(PathBuf::from("estimates.json")));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[estimate]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.estimate.points_per_sprint, 16.0);
    }

    #[test]
    fn test_load_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).unwrap().is_none());

        std::fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "[estimate]\npoints_per_sprint = 8.0\n",
        )
        .unwrap();
        let config = Config::load_from_dir(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.estimate.points_per_sprint, 8.0);

        std::fs::write(temp_dir.path().join(CONFIG_FILE), "[estimate\n").unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).is_err());
    }

    #[test]
    fn test_merge_with_args_only_overrides_explicit_values() {
        let mut config: Config = toml::from_str(
            "[source]\nrole = \"planner\"\n[estimate]\npoints_per_sprint = 21.0\n",
        )
        .unwrap();

        let args = Args::parse_from(["estimator", "--counting", "distinct", "--format", "text"]);
        config.merge_with_args(&args);

        assert_eq!(config.source.role, "planner");
        assert_eq!(config.estimate.points_per_sprint, 21.0);
        assert_eq!(config.estimate.counting, CountingPolicy::Distinct);
        assert_eq!(config.report.format, OutputFormat::Text);

        let args = Args::parse_from(["estimator", "-p", "10", "--parallel"]);
        config.merge_with_args(&args);
        assert_eq!(config.estimate.points_per_sprint, 10.0);
        assert!(config.estimate.parallel);

        let options = EstimateOptions::from(&config.estimate);
        assert_eq!(options.points_per_sprint, 10.0);
        assert_eq!(options.counting, CountingPolicy::Distinct);
    }
}
