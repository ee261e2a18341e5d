//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sprint-metrics.toml` files.

use crate::cli::OutputFormat;
use crate::models::{COMPLETED_ISSUES, ISSUES_NOT_COMPLETED, ISSUES_REMOVED_FROM_SPRINT};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".sprint-metrics.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Jira connection settings.
    #[serde(default)]
    pub jira: JiraConfig,

    /// Type filtering and category settings.
    #[serde(default)]
    pub aggregation: AggregationSettings,

    /// Reference extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Jira connection settings.
///
/// The API token is never read from the file; pass it via
/// `--api-token` or `JIRA_API_TOKEN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Jira instance URL, e.g. `https://acme.atlassian.net`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Custom field holding the sprint list of an issue.
    #[serde(default = "default_sprint_field")]
    pub sprint_field: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Account email for basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,

    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sprint_field: default_sprint_field(),
            timeout_seconds: default_timeout(),
            user_email: None,
            api_token: None,
        }
    }
}

fn default_base_url() -> String {
    "https://your-domain.atlassian.net".to_string()
}

fn default_sprint_field() -> String {
    "customfield_10007".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Type filtering and well-known category labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationSettings {
    /// Issue types that count towards the metrics. Case-sensitive.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,

    #[serde(default = "default_completed_label")]
    pub completed_label: String,

    #[serde(default = "default_not_completed_label")]
    pub not_completed_label: String,

    #[serde(default = "default_removed_label")]
    pub removed_label: String,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            allowed_types: default_allowed_types(),
            completed_label: default_completed_label(),
            not_completed_label: default_not_completed_label(),
            removed_label: default_removed_label(),
        }
    }
}

fn default_allowed_types() -> Vec<String> {
    vec!["Story", "Task", "Bug"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_completed_label() -> String {
    COMPLETED_ISSUES.to_string()
}

fn default_not_completed_label() -> String {
    ISSUES_NOT_COMPLETED.to_string()
}

fn default_removed_label() -> String {
    ISSUES_REMOVED_FROM_SPRINT.to_string()
}

/// Reference extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Trailing character marking tickets added after sprint start.
    #[serde(default = "default_marker")]
    pub marker: char,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
        }
    }
}

fn default_marker() -> char {
    '*'
}

/// Report generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format used when `--format` is not given.
    #[serde(default)]
    pub format: OutputFormat,

    /// File to write the report to, in addition to stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
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
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.jira_url {
            self.jira.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ref field) = args.sprint_field {
            self.jira.sprint_field = field.clone();
        }
        if let Some(timeout) = args.timeout {
            self.jira.timeout_seconds = timeout;
        }
        if let Some(ref user) = args.user {
            self.jira.user_email = Some(user.clone());
        }
        if let Some(ref token) = args.api_token {
            self.jira.api_token = Some(token.clone());
        }

        if let Some(ref types) = args.allowed_types {
            self.aggregation.allowed_types = types
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(ref output) = args.output {
            self.report.output = Some(output.display().to_string());
        }
    }

    /// Check settings that the CLI cannot validate on its own.
    ///
    /// Jira settings are only checked when the run will talk to Jira.
    pub fn validate(&self, needs_jira: bool) -> Result<()> {
        if needs_jira {
            let url = &self.jira.base_url;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Jira URL must start with 'http://' or 'https://': {}", url);
            }
            if self.jira.timeout_seconds == 0 {
                bail!("Timeout must be at least 1 second");
            }
            if self.jira.sprint_field.trim().is_empty() {
                bail!("Sprint field key must not be empty");
            }
        }

        if self.aggregation.allowed_types.is_empty() {
            bail!("At least one allowed issue type is required");
        }

        if self.extraction.marker.is_ascii_alphanumeric() || self.extraction.marker == '-' {
            bail!(
                "Marker '{}' would clash with ticket identifiers",
                self.extraction.marker
            );
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
