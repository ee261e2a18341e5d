//! Ticket aggregation.
//!
//! Enriches deduplicated ticket references one at a time, keeps the
//! tickets whose type is allowed, and accumulates sprint metrics.

use crate::config::AggregationSettings;
use crate::jira::MetadataFetcher;
use crate::models::{
    CategorizedReferences, CategorizedTicket, CategoryLabel, SprintMetrics, COMPLETED_ISSUES,
    ISSUES_NOT_COMPLETED, ISSUES_REMOVED_FROM_SPRINT,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Receives progress after every processed reference.
///
/// Purely observational; the aggregate does not depend on it.
pub trait ProgressSink {
    fn on_progress(&mut self, id: &str, processed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str, usize, usize),
{
    fn on_progress(&mut self, id: &str, processed: usize, total: usize) {
        self(id, processed, total)
    }
}

/// Progress sink that discards all updates.
#[allow(dead_code)] // For callers without a progress display
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _id: &str, _processed: usize, _total: usize) {}
}

/// Labels of the categories surfaced as dedicated counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLabels {
    pub completed: CategoryLabel,
    pub not_completed: CategoryLabel,
    pub removed: CategoryLabel,
}

impl Default for CategoryLabels {
    fn default() -> Self {
        Self {
            completed: COMPLETED_ISSUES.to_string(),
            not_completed: ISSUES_NOT_COMPLETED.to_string(),
            removed: ISSUES_REMOVED_FROM_SPRINT.to_string(),
        }
    }
}

/// Configuration for the aggregation engine.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Issue types that are kept. Exact, case-sensitive match.
    pub allowed_types: Vec<String>,
    pub labels: CategoryLabels,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            allowed_types: vec!["Story".to_string(), "Task".to_string(), "Bug".to_string()],
            labels: CategoryLabels::default(),
        }
    }
}

impl From<&AggregationSettings> for AggregationConfig {
    fn from(settings: &AggregationSettings) -> Self {
        Self {
            allowed_types: settings.allowed_types.clone(),
            labels: CategoryLabels {
                completed: settings.completed_label.clone(),
                not_completed: settings.not_completed_label.clone(),
                removed: settings.removed_label.clone(),
            },
        }
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub metrics: SprintMetrics,
    /// Kept tickets in processing order.
    pub tickets: Vec<CategorizedTicket>,
}

/// The aggregation engine.
///
/// Assumes single-flight use: callers must not start a second run while
/// one is in progress.
pub struct AggregationEngine {
    config: AggregationConfig,
}

impl AggregationEngine {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    #[allow(dead_code)] // Accessor
    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Whether `issue_type` counts towards the metrics.
    pub fn is_allowed(&self, issue_type: &str) -> bool {
        self.config.allowed_types.iter().any(|t| t == issue_type)
    }

    /// Enrich, filter, and count every reference.
    ///
    /// Fetches are issued strictly one at a time in category order; the
    /// next fetch starts only after the previous one settled. Unavailable
    /// tickets and disallowed types are dropped without failing the run.
    pub async fn run<F, P>(
        &self,
        references: &CategorizedReferences,
        sprint_name: &str,
        fetcher: &F,
        progress: &mut P,
    ) -> RunOutcome
    where
        F: MetadataFetcher + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let pairs: Vec<_> = references.iter_pairs().collect();
        let total_references = pairs.len();
        let added_after_start = references.added_after_start_count();

        info!(
            "Processing {} ticket references for sprint '{}'",
            total_references, sprint_name
        );

        let mut tickets = Vec::new();
        let mut from_previous_sprints = 0;
        let mut unavailable = 0;
        let mut excluded = 0;

        for (processed, (label, reference)) in pairs.into_iter().enumerate() {
            debug!("Fetching {} ({})", reference.id, label);

            match fetcher.fetch_detail(&reference.id).await {
                Err(e) => {
                    warn!("Failed to fetch details for {}: {}", reference.id, e);
                    unavailable += 1;
                }
                Ok(detail) if !self.is_allowed(&detail.issue_type) => {
                    info!(
                        "Excluding ticket {} of type {}",
                        reference.id, detail.issue_type
                    );
                    excluded += 1;
                }
                Ok(detail) => {
                    if detail.seen_in_other_sprint(sprint_name) {
                        from_previous_sprints += 1;
                    }
                    tickets.push(CategorizedTicket {
                        category: label.to_string(),
                        detail,
                    });
                }
            }

            progress.on_progress(&reference.id, processed + 1, total_references);
        }

        let by_category = count_by_category(references, &tickets);
        let count_of = |label: &str| by_category.get(label).copied().unwrap_or(0);

        let metrics = SprintMetrics {
            total_references,
            total_kept: tickets.len(),
            completed: count_of(&self.config.labels.completed),
            not_completed: count_of(&self.config.labels.not_completed),
            removed_after_start: count_of(&self.config.labels.removed),
            added_after_start,
            from_previous_sprints,
            by_category,
        };

        info!(
            "Kept {} of {} tickets ({} unavailable, {} excluded by type)",
            metrics.total_kept, total_references, unavailable, excluded
        );

        RunOutcome { metrics, tickets }
    }
}

/// Count kept tickets per category, listing every source category (zero
/// when nothing was kept) in category order.
pub fn count_by_category(
    references: &CategorizedReferences,
    tickets: &[CategorizedTicket],
) -> IndexMap<CategoryLabel, usize> {
    let mut kept: HashMap<&str, usize> = HashMap::new();
    for ticket in tickets {
        *kept.entry(ticket.category.as_str()).or_default() += 1;
    }

    references
        .labels()
        .map(|label| (label.to_string(), kept.get(label).copied().unwrap_or(0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jira::fetcher::{FetchUnavailable, UnavailableReason};
    use crate::models::TicketDetail;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory fetcher; unknown ids are unavailable.
    #[derive(Default)]
    struct StubFetcher {
        details: HashMap<String, TicketDetail>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn with(mut self, id: &str, issue_type: &str, sprints: &[&str]) -> Self {
            self.details.insert(
                id.to_string(),
                TicketDetail {
                    id: id.to_string(),
                    summary: format!("Summary of {}", id),
                    issue_type: issue_type.to_string(),
                    sprint_names: sprints.iter().map(|s| s.to_string()).collect(),
                },
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataFetcher for StubFetcher {
        async fn fetch_detail(&self, id: &str) -> Result<TicketDetail, FetchUnavailable> {
            self.calls.lock().unwrap().push(id.to_string());
            self.details
                .get(id)
                .cloned()
                .ok_or_else(|| FetchUnavailable::new(id, UnavailableReason::Status(404)))
        }
    }

    fn scenario_refs() -> CategorizedReferences {
        let mut refs = CategorizedReferences::new();
        let completed = refs.category_mut(COMPLETED_ISSUES);
        completed.insert("AB-1", true);
        completed.insert("AB-2", false);
        refs.category_mut(ISSUES_REMOVED_FROM_SPRINT)
            .insert("AB-3", false);
        refs
    }

    fn task_only_engine() -> AggregationEngine {
        AggregationEngine::new(AggregationConfig {
            allowed_types: vec!["Task".to_string()],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_sprint_scenario() {
        let fetcher = StubFetcher::default()
            .with("AB-1", "Task", &["Sprint 2"])
            .with("AB-2", "Task", &["Sprint 2"])
            .with("AB-3", "Task", &["Sprint 2"]);

        let outcome = task_only_engine()
            .run(&scenario_refs(), "Sprint 2", &fetcher, &mut NoProgress)
            .await;
        let m = outcome.metrics;

        assert_eq!(m.total_references, 3);
        assert_eq!(m.added_after_start, 1);
        assert_eq!(m.completed, 2);
        assert_eq!(m.not_completed, 0);
        assert_eq!(m.removed_after_start, 1);
        assert_eq!(m.from_previous_sprints, 0);
        assert_eq!(m.total_kept, 3);
    }

    #[tokio::test]
    async fn test_unavailable_ticket_is_dropped() {
        let fetcher = StubFetcher::default()
            .with("AB-1", "Task", &["Sprint 2"])
            .with("AB-3", "Task", &["Sprint 2"]);

        let outcome = task_only_engine()
            .run(&scenario_refs(), "Sprint 2", &fetcher, &mut NoProgress)
            .await;

        assert_eq!(outcome.metrics.completed, 1);
        assert_eq!(outcome.metrics.total_references, 3);
        assert_eq!(outcome.metrics.total_kept, 2);
        assert!(outcome.tickets.iter().all(|t| t.detail.id != "AB-2"));
    }

    #[tokio::test]
    async fn test_all_fetches_fail() {
        let fetcher = StubFetcher::default();

        let outcome = task_only_engine()
            .run(&scenario_refs(), "Sprint 2", &fetcher, &mut NoProgress)
            .await;

        assert_eq!(outcome.metrics.total_kept, 0);
        assert_eq!(outcome.metrics.total_references, 3);
        assert_eq!(outcome.metrics.added_after_start, 1);
        assert_eq!(outcome.metrics.from_previous_sprints, 0);
        assert!(outcome.tickets.is_empty());
        assert_eq!(fetcher.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_disallowed_types_are_filtered() {
        let fetcher = StubFetcher::default()
            .with("AB-1", "Task", &[])
            .with("AB-2", "Epic", &["Sprint 1"])
            .with("AB-3", "task", &[]);

        let engine = task_only_engine();
        let outcome = engine
            .run(&scenario_refs(), "Sprint 2", &fetcher, &mut NoProgress)
            .await;

        assert_eq!(outcome.tickets.len(), 1);
        for ticket in &outcome.tickets {
            assert!(engine.is_allowed(&ticket.detail.issue_type));
        }
        // Dropped tickets never count as previous-sprint carry-over
        assert_eq!(outcome.metrics.from_previous_sprints, 0);
        assert_eq!(outcome.metrics.removed_after_start, 0);
        assert!(outcome.metrics.total_kept <= outcome.metrics.total_references);
    }

    #[tokio::test]
    async fn test_previous_sprint_detection() {
        let mut refs = CategorizedReferences::new();
        let set = refs.category_mut(ISSUES_NOT_COMPLETED);
        set.insert("AB-1", false);
        set.insert("AB-2", false);
        set.insert("AB-3", false);

        let fetcher = StubFetcher::default()
            .with("AB-1", "Story", &["Sprint 1"])
            .with("AB-2", "Story", &["Sprint 2"])
            .with("AB-3", "Story", &["Sprint 1", "Sprint 2"]);

        let outcome = AggregationEngine::new(AggregationConfig::default())
            .run(&refs, "Sprint 2", &fetcher, &mut NoProgress)
            .await;

        assert_eq!(outcome.metrics.not_completed, 3);
        assert_eq!(outcome.metrics.from_previous_sprints, 2);
    }

    #[tokio::test]
    async fn test_same_id_in_two_categories_fetched_twice() {
        let mut refs = CategorizedReferences::new();
        refs.category_mut(COMPLETED_ISSUES).insert("AB-1", false);
        refs.category_mut(ISSUES_REMOVED_FROM_SPRINT)
            .insert("AB-1", false);

        let fetcher = StubFetcher::default().with("AB-1", "Bug", &["Sprint 2"]);
        let outcome = AggregationEngine::new(AggregationConfig::default())
            .run(&refs, "Sprint 2", &fetcher, &mut NoProgress)
            .await;

        assert_eq!(fetcher.calls(), vec!["AB-1", "AB-1"]);
        assert_eq!(outcome.metrics.completed, 1);
        assert_eq!(outcome.metrics.removed_after_start, 1);
    }

    #[tokio::test]
    async fn test_fetch_order_and_progress() {
        let mut refs = CategorizedReferences::new();
        refs.category_mut("Custom Column").insert("ZZ-9", false);
        refs.category_mut(COMPLETED_ISSUES).insert("AB-1", false);
        refs.category_mut(COMPLETED_ISSUES).insert("AB-2", false);

        let fetcher = StubFetcher::default()
            .with("ZZ-9", "Task", &[])
            .with("AB-1", "Task", &[]);

        let mut updates = Vec::new();
        let mut sink = |id: &str, processed: usize, total: usize| {
            updates.push((id.to_string(), processed, total));
        };

        let outcome = AggregationEngine::new(AggregationConfig::default())
            .run(&refs, "Sprint 2", &fetcher, &mut sink)
            .await;

        assert_eq!(fetcher.calls(), vec!["ZZ-9", "AB-1", "AB-2"]);
        assert_eq!(
            updates,
            vec![
                ("ZZ-9".to_string(), 1, 3),
                ("AB-1".to_string(), 2, 3),
                ("AB-2".to_string(), 3, 3),
            ]
        );

        let order: Vec<_> = outcome.tickets.iter().map(|t| t.detail.id.as_str()).collect();
        assert_eq!(order, vec!["ZZ-9", "AB-1"]);
        assert_eq!(outcome.tickets[0].category, "Custom Column");
        assert_eq!(outcome.metrics.by_category.get("Custom Column"), Some(&1));
    }

    #[test]
    fn test_well_known_categories_absent() {
        let mut refs = CategorizedReferences::new();
        refs.category_mut("Other").insert("AB-1", true);

        let fetcher = StubFetcher::default().with("AB-1", "Story", &[]);
        let outcome = tokio_test::block_on(
            AggregationEngine::new(AggregationConfig::default()).run(
                &refs,
                "Sprint 2",
                &fetcher,
                &mut NoProgress,
            ),
        );

        assert_eq!(outcome.metrics.completed, 0);
        assert_eq!(outcome.metrics.not_completed, 0);
        assert_eq!(outcome.metrics.removed_after_start, 0);
        assert_eq!(outcome.metrics.total_kept, 1);
        assert_eq!(outcome.metrics.added_after_start, 1);
    }

    #[test]
    fn test_custom_category_labels() {
        let settings = AggregationSettings {
            completed_label: "Done".to_string(),
            ..Default::default()
        };
        let engine = AggregationEngine::new(AggregationConfig::from(&settings));

        let mut refs = CategorizedReferences::new();
        refs.category_mut("Done").insert("AB-1", false);
        refs.category_mut(COMPLETED_ISSUES).insert("AB-2", false);

        let fetcher = StubFetcher::default()
            .with("AB-1", "Task", &[])
            .with("AB-2", "Task", &[]);
        let outcome =
            tokio_test::block_on(engine.run(&refs, "Sprint 2", &fetcher, &mut NoProgress));

        assert_eq!(engine.config().labels.completed, "Done");
        assert_eq!(outcome.metrics.completed, 1);
        assert_eq!(outcome.metrics.by_category.get(COMPLETED_ISSUES), Some(&1));
    }

    #[test]
    fn test_count_by_category_lists_empty_categories() {
        let mut refs = CategorizedReferences::new();
        refs.category_mut(COMPLETED_ISSUES).insert("AB-1", false);
        refs.category_mut(ISSUES_NOT_COMPLETED);

        let counts = count_by_category(&refs, &[]);
        let entries: Vec<_> = counts.into_iter().collect();
        assert_eq!(
            entries,
            vec![
                (COMPLETED_ISSUES.to_string(), 0),
                (ISSUES_NOT_COMPLETED.to_string(), 0)
            ]
        );
    }
}
