//! Sprint report generation.
//!
//! Renders sprint metrics as a plain text summary, a Markdown report,
//! or JSON. Rendering is pure: the same input always yields the same text.

use crate::cli::OutputFormat;
use crate::models::{CategorizedTicket, SprintMetrics, SprintReport};
use anyhow::Result;

/// Build the fixed-structure text summary for a sprint.
pub fn build_summary(metrics: &SprintMetrics, sprint_name: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("Results for Sprint: [{}]\n\n", sprint_name));
    output.push_str(&format!("Total Tickets: {}\n", metrics.total_kept));
    output.push_str(&format!("Completed Tickets: {}\n", metrics.completed));
    output.push_str(&format!("Not Completed Tickets: {}\n", metrics.not_completed));
    output.push_str(&format!(
        "Tickets Added After Sprint Start: {}\n",
        metrics.added_after_start
    ));
    output.push_str(&format!(
        "Tickets Removed From Sprint After Sprint Start: {}\n",
        metrics.removed_after_start
    ));
    output.push_str(&format!(
        "Tickets from Previous Sprints: {}\n",
        metrics.from_previous_sprints
    ));

    output
}

/// Render a report in the requested format.
pub fn render(report: &SprintReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(build_summary(&report.metrics, &report.metadata.sprint_name)),
        OutputFormat::Markdown => Ok(generate_markdown_report(report)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &SprintReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Sprint Report: {}\n\n",
        report.metadata.sprint_name
    ));

    output.push_str(&format!("- **Jira:** {}\n", report.metadata.jira_url));
    output.push_str(&format!(
        "- **Generated:** {}\n\n",
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str(&generate_summary_section(&report.metrics));
    output.push_str(&generate_category_section(&report.metrics));
    output.push_str(&generate_tickets_section(&report.tickets));

    output
}

fn generate_summary_section(metrics: &SprintMetrics) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Metric | Count |\n");
    section.push_str("|:---|:---:|\n");

    let rows = [
        ("Total Tickets", metrics.total_kept),
        ("Completed Tickets", metrics.completed),
        ("Not Completed Tickets", metrics.not_completed),
        ("Tickets Added After Sprint Start", metrics.added_after_start),
        (
            "Tickets Removed From Sprint After Sprint Start",
            metrics.removed_after_start,
        ),
        ("Tickets from Previous Sprints", metrics.from_previous_sprints),
    ];
    for (name, count) in rows {
        section.push_str(&format!("| {} | {} |\n", name, count));
    }
    section.push('\n');

    section
}

fn generate_category_section(metrics: &SprintMetrics) -> String {
    if metrics.by_category.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Tickets by Category\n\n");
    section.push_str("| Category | Tickets |\n");
    section.push_str("|:---|:---:|\n");
    for (category, count) in &metrics.by_category {
        section.push_str(&format!("| {} | {} |\n", category, count));
    }
    section.push('\n');

    section
}

fn generate_tickets_section(tickets: &[CategorizedTicket]) -> String {
    let mut section = String::new();

    section.push_str("## Tickets\n\n");

    if tickets.is_empty() {
        section.push_str("No tickets matched the allowed issue types.\n\n");
        return section;
    }

    section.push_str("| Ticket | Category | Type | Summary | Sprints |\n");
    section.push_str("|:---|:---|:---|:---|:---|\n");
    for ticket in tickets {
        let detail = &ticket.detail;
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            detail.id,
            ticket.category,
            detail.issue_type,
            escape_cell(&detail.summary),
            detail.sprint_names.join(", ")
        ));
    }
    section.push('\n');

    section
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &SprintReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
