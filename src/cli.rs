//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sprint Metrics - summarize a Jira sprint report
///
/// Reads the ticket tables exported from a sprint report page, looks up
/// every ticket in Jira, and prints sprint metrics: completed and
/// not-completed tickets, scope added or removed after sprint start, and
/// tickets carried over from previous sprints.
///
/// Examples:
///   sprint-metrics --sources report.json --jira-url https://acme.atlassian.net
///   sprint-metrics --sources report.json --sprint "Sprint 42" --format markdown
///   sprint-metrics --sources report.json --dry-run
///   sprint-metrics --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON export of the sprint report tables
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub sources: Option<PathBuf>,

    /// Display name of the sprint being reported
    ///
    /// Overrides the sprint name stored in the sources file.
    #[arg(long, value_name = "NAME")]
    pub sprint: Option<String>,

    /// Jira instance URL
    #[arg(long, value_name = "URL", env = "JIRA_BASE_URL")]
    pub jira_url: Option<String>,

    /// Jira account email for basic auth
    #[arg(short, long, value_name = "EMAIL", env = "JIRA_USER_EMAIL")]
    pub user: Option<String>,

    /// Jira API token for basic auth
    #[arg(long, value_name = "TOKEN", env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Custom field key holding the sprint list of an issue
    #[arg(long, value_name = "FIELD")]
    pub sprint_field: Option<String>,

    /// Issue types to count (comma-separated)
    ///
    /// Example: --allowed-types Story,Task,Bug
    #[arg(long, value_name = "TYPES", value_delimiter = ',')]
    pub allowed_types: Option<Vec<String>>,

    /// Output format (text, markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Also write the report to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sprint-metrics.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not verify the Jira session before running
    #[arg(long)]
    pub skip_session_check: bool,

    /// Dry run: extract ticket references without calling Jira
    ///
    /// Shows the references found per category and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .sprint-metrics.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text summary (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
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

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.jira_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Jira URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref types) = self.allowed_types {
            if types.iter().all(|t| t.trim().is_empty()) {
                return Err("--allowed-types needs at least one issue type".to_string());
            }
        }

        if self.api_token.is_some() && self.user.is_none() {
            return Err("--api-token requires --user".to_string());
        }

        // Validate sources file if provided
        if let Some(ref path) = self.sources {
            if !path.is_file() {
                return Err(format!("Sources file does not exist: {}", path.display()));
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
}
