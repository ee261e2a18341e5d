//! Data models for sprint metrics.
//!
//! This module contains the core data structures used throughout
//! the application for representing ticket references, enriched
//! ticket details, and the final sprint aggregate.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Label of a sprint report category (e.g. "Completed Issues").
///
/// Not a closed set: any label found in the sources is kept verbatim.
pub type CategoryLabel = String;

/// Category label for completed tickets.
pub const COMPLETED_ISSUES: &str = "Completed Issues";
/// Category label for tickets still open at sprint end.
pub const ISSUES_NOT_COMPLETED: &str = "Issues Not Completed";
/// Category label for tickets pulled out of the sprint.
pub const ISSUES_REMOVED_FROM_SPRINT: &str = "Issues Removed From Sprint";

/// A ticket identifier discovered in a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReference {
    /// Ticket key, e.g. `AB-12`. Case-sensitive.
    pub id: String,
    /// Whether the ticket was added after the sprint started.
    pub added_after_start: bool,
}

/// Deduplicated references of a single category, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    entries: IndexMap<String, bool>,
}

impl ReferenceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reference. Re-inserting an identifier keeps its position and
    /// ORs the added-after-start flag.
    ///
    /// Returns `true` if the identifier was not present before.
    pub fn insert(&mut self, id: &str, added_after_start: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(flag) => {
                *flag |= added_after_start;
                false
            }
            None => {
                self.entries.insert(id.to_string(), added_after_start);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[allow(dead_code)] // Lookup utility
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Look up a reference by identifier.
    #[allow(dead_code)] // Lookup utility
    pub fn get(&self, id: &str) -> Option<TicketReference> {
        self.entries.get(id).map(|flag| TicketReference {
            id: id.to_string(),
            added_after_start: *flag,
        })
    }

    /// Iterate references in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = TicketReference> + '_ {
        self.entries.iter().map(|(id, flag)| TicketReference {
            id: id.clone(),
            added_after_start: *flag,
        })
    }

    /// Number of references flagged as added after sprint start.
    pub fn added_after_start_count(&self) -> usize {
        self.entries.values().filter(|flag| **flag).count()
    }
}

/// References grouped by category, in category order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedReferences {
    categories: IndexMap<CategoryLabel, ReferenceSet>,
}

impl CategorizedReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the set for a category, creating it (at the end) if missing.
    pub fn category_mut(&mut self, label: &str) -> &mut ReferenceSet {
        self.categories.entry(label.to_string()).or_default()
    }

    #[allow(dead_code)] // Lookup utility
    pub fn get(&self, label: &str) -> Option<&ReferenceSet> {
        self.categories.get(label)
    }

    /// Category labels in iteration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Iterate categories with their reference sets.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReferenceSet)> {
        self.categories.iter().map(|(label, set)| (label.as_str(), set))
    }

    /// Flatten into (category, reference) pairs: category order, then
    /// first-seen order within a category.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&str, TicketReference)> + '_ {
        self.categories
            .iter()
            .flat_map(|(label, set)| set.iter().map(move |r| (label.as_str(), r)))
    }

    /// Sum of all category set sizes.
    pub fn total_references(&self) -> usize {
        self.categories.values().map(ReferenceSet::len).sum()
    }

    /// Added-after-start flags summed over every category.
    pub fn added_after_start_count(&self) -> usize {
        self.categories
            .values()
            .map(ReferenceSet::added_after_start_count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_references() == 0
    }
}

/// Authoritative metadata for a ticket, as returned by the issue tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetail {
    pub id: String,
    pub summary: String,
    pub issue_type: String,
    /// Names of every sprint the ticket has been part of, in tracker order.
    pub sprint_names: Vec<String>,
}

impl TicketDetail {
    /// True if any listed sprint differs from `current_sprint`.
    ///
    /// A ticket that lists the current sprint alongside an older one still
    /// counts as coming from a previous sprint.
    pub fn seen_in_other_sprint(&self, current_sprint: &str) -> bool {
        self.sprint_names.iter().any(|name| name != current_sprint)
    }
}

/// A ticket that survived type filtering, tagged with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedTicket {
    pub category: CategoryLabel,
    pub detail: TicketDetail,
}

/// Final aggregate for one run. Counts cover kept tickets unless noted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintMetrics {
    /// Deduplicated references across all categories (before filtering).
    pub total_references: usize,
    /// Tickets that were enriched and have an allowed type.
    pub total_kept: usize,
    /// Kept tickets per category, in category order.
    pub by_category: IndexMap<CategoryLabel, usize>,
    pub completed: usize,
    pub not_completed: usize,
    /// References carrying the added-after-start marker (before filtering).
    pub added_after_start: usize,
    /// Kept tickets in the removed-from-sprint category.
    pub removed_after_start: usize,
    /// Kept tickets listing at least one sprint other than the current one.
    pub from_previous_sprints: usize,
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Display name of the sprint the report covers.
    pub sprint_name: String,
    /// Base URL of the Jira instance queried.
    pub jira_url: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Run duration in seconds.
    pub duration_seconds: f64,
}

/// The complete sprint report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintReport {
    pub metadata: ReportMetadata,
    pub metrics: SprintMetrics,
    /// Kept tickets in processing order.
    pub tickets: Vec<CategorizedTicket>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_set_dedup() {
        let mut set = ReferenceSet::new();
        assert!(set.insert("AB-1", false));
        assert!(!set.insert("AB-1", false));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_reference_set_marker_is_sticky() {
        let mut set = ReferenceSet::new();
        set.insert("AB-1", true);
        set.insert("AB-1", false);
        assert_eq!(set.get("AB-1").map(|r| r.added_after_start), Some(true));

        let mut set = ReferenceSet::new();
        set.insert("AB-1", false);
        set.insert("AB-1", true);
        assert_eq!(set.get("AB-1").map(|r| r.added_after_start), Some(true));
        assert_eq!(set.added_after_start_count(), 1);
    }

    #[test]
    fn test_reference_set_is_case_sensitive() {
        let mut set = ReferenceSet::new();
        set.insert("AB-1", false);
        set.insert("ab-1", false);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_same_id_in_two_categories() {
        let mut refs = CategorizedReferences::new();
        refs.category_mut(COMPLETED_ISSUES).insert("AB-1", true);
        refs.category_mut(ISSUES_REMOVED_FROM_SPRINT).insert("AB-1", false);

        assert_eq!(refs.total_references(), 2);
        assert_eq!(refs.added_after_start_count(), 1);

        let pairs: Vec<_> = refs.iter_pairs().collect();
        assert_eq!(pairs[0].0, COMPLETED_ISSUES);
        assert!(pairs[0].1.added_after_start);
        assert_eq!(pairs[1].0, ISSUES_REMOVED_FROM_SPRINT);
        assert!(!pairs[1].1.added_after_start);
    }

    #[test]
    fn test_iter_pairs_order() {
        let mut refs = CategorizedReferences::new();
        refs.category_mut("B").insert("X-2", false);
        refs.category_mut("A").insert("X-1", false);
        refs.category_mut("B").insert("X-3", false);

        let ids: Vec<_> = refs.iter_pairs().map(|(_, r)| r.id).collect();
        assert_eq!(ids, vec!["X-2", "X-3", "X-1"]);
    }

    #[test]
    fn test_seen_in_other_sprint() {
        let detail = TicketDetail {
            id: "AB-1".to_string(),
            summary: "Test".to_string(),
            issue_type: "Task".to_string(),
            sprint_names: vec!["Sprint 1".to_string()],
        };
        assert!(detail.seen_in_other_sprint("Sprint 2"));
        assert!(!detail.seen_in_other_sprint("Sprint 1"));

        let both = TicketDetail {
            sprint_names: vec!["Sprint 1".to_string(), "Sprint 2".to_string()],
            ..detail.clone()
        };
        assert!(both.seen_in_other_sprint("Sprint 2"));

        let none = TicketDetail {
            sprint_names: vec![],
            ..detail
        };
        assert!(!none.seen_in_other_sprint("Sprint 2"));
    }
}
