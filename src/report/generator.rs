//! Report rendering.
//!
//! This module renders estimate reports as Markdown tables, pretty-printed
//! JSON, or a fixed-width plain-text listing.

use crate::analysis::largest_objectives;
use crate::models::{Bounds, EstimatedGraph, EstimatedNode, PortfolioSummary, Report, ReportMetadata};
use anyhow::Result;

/// Format a number with at most two decimals, trimming trailing zeros.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Format a range as `low - high`.
pub fn format_range(bounds: Bounds) -> String {
    format!("{} - {}", format_number(bounds.low), format_number(bounds.high))
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, graph: &EstimatedGraph) -> String {
    let mut output = String::new();

    output.push_str("# Estimate Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary, graph));
    output.push_str(&generate_objectives_section(&report.objectives));
    output.push_str(&generate_tickets_section(&report.tickets));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Points per Sprint:** {}\n",
        format_number(metadata.points_per_sprint)
    ));
    section.push_str(&format!("- **Counting:** {}\n", metadata.counting));
    if let Some(ref query) = metadata.objective_query {
        section.push_str(&format!("- **Objective Filter:** `{}`\n", query));
    }
    if let Some(ref query) = metadata.ticket_query {
        section.push_str(&format!("- **Ticket Filter:** `{}`\n", query));
    }
    section.push_str(&format!(
        "- **Duration:** {:.3}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_summary_section(summary: &PortfolioSummary, graph: &EstimatedGraph) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Objectives | Tickets | Dependencies | Total Points | Total Sprints |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        summary.objectives,
        summary.tickets,
        summary.edges,
        format_range(summary.total_points),
        format_range(summary.total_sprints)
    ));

    if !summary.by_risk.is_empty() {
        section.push_str("### Tickets by Risk\n\n");
        section.push_str("| Risk | Tickets |\n");
        section.push_str("|:---|:---:|\n");
        for (risk, count) in &summary.by_risk {
            section.push_str(&format!("| {} | {} |\n", risk, count));
        }
        section.push('\n');
    }

    let largest = largest_objectives(graph, 5);
    if !largest.is_empty() {
        section.push_str("### Largest Objectives\n\n");
        section.push_str("| Objective | Cumulative Points |\n");
        section.push_str("|:---|:---:|\n");
        for (objective, points) in largest {
            section.push_str(&format!(
                "| {} | {} |\n",
                objective.node.name,
                format_range(points)
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_objectives_section(objectives: &[EstimatedNode]) -> String {
    let mut section = String::new();

    section.push_str("## Objectives\n\n");
    if objectives.is_empty() {
        section.push_str("No objectives match.\n\n");
        return section;
    }

    section.push_str(
        "| # | Name | Points (ind) | Sprints (ind) | Points (cum) | Sprints (cum) |\n",
    );
    section.push_str("|---:|:---|:---:|:---:|:---:|:---:|\n");

    for node in objectives {
        let estimate = node.objective().copied().unwrap_or_default();
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            node.node.id,
            node.node.name,
            format_range(estimate.points_ind),
            format_range(estimate.sprints_ind),
            format_range(estimate.points_cumulative),
            format_range(estimate.sprints_cumulative)
        ));
    }
    section.push('\n');

    section
}

fn generate_tickets_section(tickets: &[EstimatedNode]) -> String {
    let mut section = String::new();

    section.push_str("## Tickets\n\n");
    if tickets.is_empty() {
        section.push_str("No tickets match.\n\n");
        return section;
    }

    section.push_str("| # | Name | Risk | Points |\n");
    section.push_str("|---:|:---|:---:|:---:|\n");

    for node in tickets {
        if let Some((estimate, risk)) = node.node.ticket_estimate() {
            let upper = node.estimate_upper().unwrap_or(estimate);
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                node.node.id,
                node.node.name,
                risk,
                format_range(Bounds::new(estimate, upper))
            ));
        }
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by estimator*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a plain-text report with fixed-width columns.
pub fn generate_text_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Points per sprint: {} ({} counting)\n\n",
        format_number(report.metadata.points_per_sprint),
        report.metadata.counting
    ));

    output.push_str(&format!(
        "{:>5}  {:<32}  {:>15}  {:>13}  {:>15}  {:>13}\n",
        "#", "OBJECTIVE", "POINTS (IND)", "SPRINTS (IND)", "POINTS (CUM)", "SPRINTS (CUM)"
    ));
    for node in &report.objectives {
        let estimate = node.objective().copied().unwrap_or_default();
        output.push_str(&format!(
            "{:>5}  {:<32}  {:>15}  {:>13}  {:>15}  {:>13}\n",
            node.node.id,
            truncate(&node.node.name, 32),
            format_range(estimate.points_ind),
            format_range(estimate.sprints_ind),
            format_range(estimate.points_cumulative),
            format_range(estimate.sprints_cumulative)
        ));
    }

    output.push('\n');
    output.push_str(&format!(
        "{:>5}  {:<32}  {:<6}  {:>15}\n",
        "#", "TICKET", "RISK", "POINTS"
    ));
    for node in &report.tickets {
        if let Some((estimate, risk)) = node.node.ticket_estimate() {
            let upper = node.estimate_upper().unwrap_or(estimate);
            output.push_str(&format!(
                "{:>5}  {:<32}  {:<6}  {:>15}\n",
                node.node.id,
                truncate(&node.node.name, 32),
                risk.to_string(),
                format_range(Bounds::new(estimate, upper))
            ));
        }
    }

    output
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let kept: String = name.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summarize;
    use crate::estimate::{compute_estimates, EstimateOptions};
    use crate::models::{CountingPolicy, Edge, Graph, Node, RiskLevel};
    use chrono::Utc;

    fn create_test_report() -> (Report, EstimatedGraph) {
        let graph = Graph {
            nodes: vec![
                Node::objective(1, "Launch"),
                Node::ticket(2, "API", 10.0, RiskLevel::Low),
                Node::ticket(3, "Schema", 5.0, RiskLevel::None),
            ],
            edges: vec![Edge::new(2, 1), Edge::new(3, 2)],
        };
        let options = EstimateOptions {
            points_per_sprint: 5.0,
            ..EstimateOptions::default()
        };
        let estimated = compute_estimates(&graph, &options).unwrap();

        let report = Report {
            metadata: ReportMetadata {
                source: "fixtures/portfolio.json".to_string(),
                generated_at: Utc::now(),
                points_per_sprint: 5.0,
                counting: CountingPolicy::PerPath,
                objective_query: Some("launch".to_string()),
                ticket_query: None,
                duration_seconds: 0.01,
            },
            summary: summarize(&estimated, 5.0),
            objectives: estimated.objectives().cloned().collect(),
            tickets: estimated.tickets().cloned().collect(),
        };

        (report, estimated)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(18.000000000000004), "18");
        assert_eq!(format_number(3.6000000000000005), "3.6");
        assert_eq!(format_number(1.25), "1.25");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(f64::INFINITY), "∞");
        assert_eq!(format_range(Bounds::new(15.0, 18.0)), "15 - 18");
    }

    #[test]
    fn test_generate_markdown_report() {
        let (report, graph) = create_test_report();
        let markdown = generate_markdown_report(&report, &graph);

        assert!(markdown.contains("# Estimate Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("**Objective Filter:** `launch`"));
        assert!(!markdown.contains("Ticket Filter"));
        assert!(markdown.contains("## Objectives"));
        assert!(markdown.contains("| 1 | Launch | 15 - 18 | 3 - 3.6 | 15 - 18 | 3 - 3.6 |"));
        assert!(markdown.contains("| 2 | API | low | 10 - 13 |"));
        assert!(markdown.contains("### Largest Objectives"));
    }

    #[test]
    fn test_markdown_empty_lists() {
        let (mut report, graph) = create_test_report();
        report.objectives.clear();
        report.tickets.clear();

        let markdown = generate_markdown_report(&report, &graph);
        assert!(markdown.contains("No objectives match."));
        assert!(markdown.contains("No tickets match."));
    }

    #[test]
    fn test_generate_json_report() {
        let (report, _) = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"pointsInd\""));
        assert!(json.contains("\"sprintsCumulative\""));
        assert!(json.contains("\"estimate_upper\""));
        assert!(json.contains("\"risk_level\": \"low\""));
        assert!(json.contains("\"counting\": \"per-path\""));
    }

    #[test]
    fn test_generate_text_report() {
        let (report, _) = create_test_report();
        let text = generate_text_report(&report);

        assert!(text.contains("OBJECTIVE"));
        assert!(text.contains("Launch"));
        assert!(text.contains("15 - 18"));
        assert!(text.contains("Schema"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long objective name", 6), "a ver…");
    }
}
