//! Ticket reference extraction.
//!
//! Scans the raw cells of every category for ticket identifiers and
//! collects them into per-category deduplicated sets.

use crate::models::CategorizedReferences;
use crate::sources::{CategorySources, SourceCell};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Project key, hyphen, sequence number (e.g. `AB-12`, `X2-7`).
static TICKET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z0-9]+-[0-9]+\b").expect("Invalid ticket id regex"));

/// Extracts ticket references from category sources.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    marker: char,
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self { marker: '*' }
    }
}

impl ReferenceExtractor {
    /// Create an extractor using `marker` as the added-after-start marker.
    pub fn new(marker: char) -> Self {
        Self { marker }
    }

    /// Extract references from every category.
    ///
    /// Never fails: cells without an identifier are skipped, and a category
    /// without matches yields an empty set.
    pub fn extract(&self, sources: &CategorySources) -> CategorizedReferences {
        let mut references = CategorizedReferences::new();

        for (label, cells) in &sources.categories {
            let set = references.category_mut(label);

            for cell in cells {
                match self.parse_cell(cell) {
                    Some((id, marked)) => {
                        if !set.insert(&id, marked) {
                            trace!("Duplicate {} in '{}'", id, label);
                        }
                    }
                    None => trace!("No ticket id in cell '{}'", cell.text),
                }
            }

            debug!("Category '{}': {} references", label, set.len());
        }

        references
    }

    /// Parse one cell into `(identifier, added_after_start)`.
    pub fn parse_cell(&self, cell: &SourceCell) -> Option<(String, bool)> {
        let text = cell.text.trim();
        let marked = cell
            .marked
            .unwrap_or_else(|| text.ends_with(self.marker));

        let stripped = text.replace(self.marker, "");
        let id = TICKET_ID.find(&stripped)?.as_str().to_string();

        Some((id, marked))
    }
}
