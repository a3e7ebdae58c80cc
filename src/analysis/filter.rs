//! Node filtering and portfolio statistics.
//!
//! This module provides the name filters applied to the objective and
//! ticket lists and computes summary statistics over an estimated graph.

use crate::models::{Bounds, EstimatedGraph, EstimatedNode, PortfolioSummary};
use std::cmp::Ordering;

/// Case-insensitive substring match on the node name. Empty queries match everything.
pub fn matches_name(node: &EstimatedNode, query: &str) -> bool {
    let query = query.trim();
    query.is_empty()
        || node
            .node
            .name
            .to_lowercase()
            .contains(&query.to_lowercase())
}

/// Objectives whose name matches `query`, in graph order.
pub fn filter_objectives<'a>(graph: &'a EstimatedGraph, query: &str) -> Vec<&'a EstimatedNode> {
    graph.objectives().filter(|n| matches_name(n, query)).collect()
}

/// Tickets whose name matches `query`, in graph order.
pub fn filter_tickets<'a>(graph: &'a EstimatedGraph, query: &str) -> Vec<&'a EstimatedNode> {
    graph.tickets().filter(|n| matches_name(n, query)).collect()
}

/// Compute portfolio-wide statistics.
pub fn summarize(graph: &EstimatedGraph, points_per_sprint: f64) -> PortfolioSummary {
    let mut summary = PortfolioSummary {
        edges: graph.edges.len(),
        ..PortfolioSummary::default()
    };

    for estimated in &graph.nodes {
        match estimated.node.ticket_estimate() {
            Some((estimate, risk)) => {
                summary.tickets += 1;
                summary.total_points.low += estimate;
                summary.total_points.high += estimated.estimate_upper().unwrap_or(estimate);
                *summary.by_risk.entry(risk).or_insert(0) += 1;
            }
            None => summary.objectives += 1,
        }
    }

    summary.total_sprints = summary.total_points.to_sprints(points_per_sprint);
    summary
}

/// The `n` objectives with the largest cumulative worst case.
pub fn largest_objectives(graph: &EstimatedGraph, n: usize) -> Vec<(&EstimatedNode, Bounds)> {
    let mut objectives: Vec<_> = graph
        .objectives()
        .filter_map(|node| node.objective().map(|e| (node, e.points_cumulative)))
        .filter(|(_, points)| points.high > 0.0)
        .collect();

    objectives.sort_by(|a, b| b.1.high.partial_cmp(&a.1.high).unwrap_or(Ordering::Equal));
    objectives.truncate(n);

    objectives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::{compute_estimates, EstimateOptions};
    use crate::models::{Edge, Graph, Node, RiskLevel};

    fn create_test_graph() -> EstimatedGraph {
        let graph = Graph {
            nodes: vec![
                Node::objective(1, "Parallel checkout"),
                Node::objective(2, "Marketing site"),
                Node::ticket(3, "Checkout API", 8.0, RiskLevel::Large),
                Node::ticket(4, "Parallel workers", 4.0, RiskLevel::Low),
                Node::ticket(5, "Hero banner", 2.0, RiskLevel::None),
            ],
            edges: vec![Edge::new(3, 1), Edge::new(4, 3), Edge::new(5, 2)],
        };
        compute_estimates(&graph, &EstimateOptions::default()).unwrap()
    }

    #[test]
    fn test_filter_objectives_case_insensitive() {
        let graph = create_test_graph();

        let all = filter_objectives(&graph, "");
        assert_eq!(all.len(), 2);

        let parallel = filter_objectives(&graph, "PARALLEL");
        assert_eq!(parallel.len(), 1);
        assert_eq!(parallel[0].node.name, "Parallel checkout");

        assert!(filter_objectives(&graph, "nothing like it").is_empty());
    }

    #[test]
    fn test_filter_tickets_only_returns_tickets() {
        let graph = create_test_graph();

        let tickets = filter_tickets(&graph, "  ");
        assert_eq!(tickets.len(), 3);
        assert!(tickets.iter().all(|n| n.node.is_ticket()));

        let parallel = filter_tickets(&graph, "parallel");
        assert_eq!(parallel.len(), 1);
        assert_eq!(parallel[0].node.name, "Parallel workers");
    }

    #[test]
    fn test_summarize() {
        let graph = create_test_graph();
        let summary = summarize(&graph, 7.0);

        assert_eq!(summary.objectives, 2);
        assert_eq!(summary.tickets, 3);
        assert_eq!(summary.edges, 3);
        assert!((summary.total_points.low - 14.0).abs() < 1e-9);
        assert!((summary.total_points.high - (20.0 + 5.2 + 2.0)).abs() < 1e-9);
        assert!((summary.total_sprints.low - 2.0).abs() < 1e-9);
        assert_eq!(summary.by_risk.get(&RiskLevel::Large), Some(&1));
        assert_eq!(summary.by_risk.get(&RiskLevel::Medium), None);
    }

    #[test]
    fn test_largest_objectives() {
        let graph = create_test_graph();
        let largest = largest_objectives(&graph, 1);

        assert_eq!(largest.len(), 1);
        assert_eq!(largest[0].0.node.name, "Parallel checkout");
        assert!((largest[0].1.low - 12.0).abs() < 1e-9);
    }
}
