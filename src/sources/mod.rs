//! Category sources exported from a sprint report page.
//!
//! The page scraper writes each report table as a labeled list of raw
//! text cells. This module loads that export from disk.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Sprint name used when neither the export nor the CLI provide one.
pub const UNKNOWN_SPRINT: &str = "Unknown Sprint";

/// A single raw table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCell {
    /// Full text content of the cell, trimmed or not.
    pub text: String,
    /// Explicit "has trailing marker" signal from the scraper.
    ///
    /// When absent, the marker is detected from `text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked: Option<bool>,
}

impl SourceCell {
    #[allow(dead_code)] // Test and builder convenience
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marked: None,
        }
    }
}

/// One report table as exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySource {
    pub label: String,
    #[serde(default)]
    pub cells: Vec<SourceCell>,
}

/// On-disk export format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sprint_name: Option<String>,
    #[serde(default)]
    categories: Vec<CategorySource>,
}

/// All category sources of one sprint report, in page order.
#[derive(Debug, Clone, Default)]
pub struct CategorySources {
    /// Sprint display name captured with the page, if any.
    pub sprint_name: Option<String>,
    /// Cells per category label. A label listed twice is merged into its
    /// first position.
    pub categories: IndexMap<String, Vec<SourceCell>>,
}

impl CategorySources {
    /// Parse a sources export from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: SourcesFile =
            serde_json::from_str(content).context("Invalid category sources JSON")?;

        let mut categories: IndexMap<String, Vec<SourceCell>> = IndexMap::new();
        for source in file.categories {
            categories
                .entry(source.label)
                .or_default()
                .extend(source.cells);
        }

        let sprint_name = file
            .sprint_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Ok(Self {
            sprint_name,
            categories,
        })
    }

    /// Add a category with its cells, merging into an existing label.
    #[allow(dead_code)] // Builder used by tests
    pub fn push(&mut self, label: impl Into<String>, cells: Vec<SourceCell>) {
        self.categories.entry(label.into()).or_default().extend(cells);
    }

    /// Resolve the sprint display name, preferring an explicit override.
    pub fn resolve_sprint_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .or_else(|| self.sprint_name.clone())
            .unwrap_or_else(|| UNKNOWN_SPRINT.to_string())
    }

    /// Total number of raw cells across all categories.
    pub fn cell_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

/// Load category sources from a JSON export file.
pub fn load_sources(path: &Path) -> Result<CategorySources> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file: {}", path.display()))?;

    let sources = CategorySources::from_json(&content)
        .with_context(|| format!("Failed to parse sources file: {}", path.display()))?;

    debug!(
        "Loaded {} categories ({} cells) from {}",
        sources.categories.len(),
        sources.cell_count(),
        path.display()
    );

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
{
  "sprint_name": " Sprint 2 ",
  "categories": [
    { "label": "Completed Issues", "cells": [ { "text": "AB-1 *" }, { "text": "AB-2", "marked": false } ] },
    { "label": "Issues Removed From Sprint", "cells": [ { "text": "AB-3" } ] },
    { "label": "Completed Issues", "cells": [ { "text": "AB-4" } ] }
  ]
}
"#;

    #[test]
    fn test_parse_sources() {
        let sources = CategorySources::from_json(SAMPLE).unwrap();
        assert_eq!(sources.sprint_name.as_deref(), Some("Sprint 2"));

        let labels: Vec<_> = sources.categories.keys().cloned().collect();
        assert_eq!(labels, vec!["Completed Issues", "Issues Removed From Sprint"]);
        assert_eq!(sources.categories["Completed Issues"].len(), 3);
        assert_eq!(
            sources.categories["Completed Issues"][1].marked,
            Some(false)
        );
        assert_eq!(sources.cell_count(), 4);
    }

    #[test]
    fn test_resolve_sprint_name() {
        let sources = CategorySources::from_json(SAMPLE).unwrap();
        assert_eq!(sources.resolve_sprint_name(None), "Sprint 2");
        assert_eq!(sources.resolve_sprint_name(Some("Sprint 9")), "Sprint 9");
        assert_eq!(sources.resolve_sprint_name(Some("  ")), "Sprint 2");

        let empty = CategorySources::default();
        assert_eq!(empty.resolve_sprint_name(None), UNKNOWN_SPRINT);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(CategorySources::from_json("not json").is_err());
    }

    #[test]
    fn test_load_sources_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let sources = load_sources(file.path()).unwrap();
        assert_eq!(sources.categories.len(), 2);
    }

    #[test]
    fn test_load_sources_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sources(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read sources file"));
    }
}
