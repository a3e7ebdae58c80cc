//! Data models for the estimator.
//!
//! This module contains the core data structures shared by the data
//! source, the aggregation engine and the report generator: the
//! dependency graph itself, the per-node estimates derived from it, and
//! the report assembled from those estimates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque node identifier, unique across one graph.
///
/// Backends hand out either integer keys or string keys (UUIDs); both
/// compare by exact value, so `5` and `"5"` are different nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Text(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(id) => fmt::Display::fmt(id, f),
            NodeId::Text(id) => f.pad(id),
        }
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        NodeId::Int(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::Text(id.to_string())
    }
}

/// Qualitative risk attached to a ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// No known risk
    #[default]
    None,
    /// Minor unknowns
    Low,
    /// Notable unknowns
    Medium,
    /// Major unknowns
    Large,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::None => write!(f, "none"),
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::Large => write!(f, "large"),
        }
    }
}

impl RiskLevel {
    /// Parse a risk label. Labels are matched exactly; missing or
    /// unrecognized labels (including `"Low"` or `" low "`) are `None`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("low") => RiskLevel::Low,
            Some("medium") => RiskLevel::Medium,
            Some("large") => RiskLevel::Large,
            _ => RiskLevel::None,
        }
    }

    /// Scaling factor applied to a raw estimate to get its upper bound.
    pub fn multiplier(&self) -> f64 {
        match self {
            RiskLevel::None => 1.0,
            RiskLevel::Low => 1.3,
            RiskLevel::Medium => 1.7,
            RiskLevel::Large => 2.5,
        }
    }
}

/// How a ticket reached through several paths contributes to a sum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CountingPolicy {
    /// Each ticket counts once per objective; tolerates cycles
    Distinct,
    /// Each ticket counts once per distinct edge path to the objective
    #[default]
    PerPath,
}

impl fmt::Display for CountingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountingPolicy::Distinct => write!(f, "distinct"),
            CountingPolicy::PerPath => write!(f, "per-path"),
        }
    }
}

/// Type-specific node payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// A deliverable aggregating effort from its prerequisites.
    Objective,
    /// A unit of estimated work.
    Ticket {
        estimate: f64,
        #[serde(rename = "risk_level")]
        risk: RiskLevel,
    },
}

/// A node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Display sort key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Create an objective node.
    #[allow(dead_code)] // Builder utility
    pub fn objective(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: NodeId::Int(id),
            name: name.into(),
            order: None,
            tags: Vec::new(),
            kind: NodeKind::Objective,
        }
    }

    /// Create a ticket node.
    #[allow(dead_code)] // Builder utility
    pub fn ticket(id: i64, name: impl Into<String>, estimate: f64, risk: RiskLevel) -> Self {
        Self {
            id: NodeId::Int(id),
            name: name.into(),
            order: None,
            tags: Vec::new(),
            kind: NodeKind::Ticket { estimate, risk },
        }
    }

    pub fn is_ticket(&self) -> bool {
        matches!(self.kind, NodeKind::Ticket { .. })
    }

    pub fn is_objective(&self) -> bool {
        matches!(self.kind, NodeKind::Objective)
    }

    /// Raw estimate and risk, for tickets only.
    pub fn ticket_estimate(&self) -> Option<(f64, RiskLevel)> {
        match self.kind {
            NodeKind::Ticket { estimate, risk } => Some((estimate, risk)),
            NodeKind::Objective => None,
        }
    }
}

/// Directed edge: `from` is a prerequisite of `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl Edge {
    pub fn new(from: i64, to: i64) -> Self {
        Self {
            from: NodeId::Int(from),
            to: NodeId::Int(to),
        }
    }
}

/// The full node and edge set handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// A best-case/worst-case pair. Serialized as `[low, high]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds { low: 0.0, high: 0.0 };

    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Divide both bounds by the sprint capacity.
    pub fn to_sprints(self, points_per_sprint: f64) -> Self {
        Self {
            low: self.low / points_per_sprint,
            high: self.high / points_per_sprint,
        }
    }
}

impl Serialize for Bounds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.low, self.high].serialize(serializer)
    }
}

/// Derived values for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TicketEstimate {
    pub estimate_upper: f64,
}

/// Derived ranges for an objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveEstimate {
    /// Tickets reachable through ticket-only chains.
    pub points_ind: Bounds,
    pub sprints_ind: Bounds,
    /// Every ticket in the transitive closure.
    pub points_cumulative: Bounds,
    pub sprints_cumulative: Bounds,
}

impl ObjectiveEstimate {
    pub fn from_points(individual: Bounds, cumulative: Bounds, points_per_sprint: f64) -> Self {
        Self {
            points_ind: individual,
            sprints_ind: individual.to_sprints(points_per_sprint),
            points_cumulative: cumulative,
            sprints_cumulative: cumulative.to_sprints(points_per_sprint),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeEstimate {
    Objective(ObjectiveEstimate),
    Ticket(TicketEstimate),
}

/// A node together with the values the engine derived for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatedNode {
    #[serde(flatten)]
    pub node: Node,
    #[serde(flatten)]
    pub estimate: NodeEstimate,
}

impl EstimatedNode {
    pub fn objective(&self) -> Option<&ObjectiveEstimate> {
        match &self.estimate {
            NodeEstimate::Objective(estimate) => Some(estimate),
            NodeEstimate::Ticket(_) => None,
        }
    }

    pub fn estimate_upper(&self) -> Option<f64> {
        match &self.estimate {
            NodeEstimate::Ticket(ticket) => Some(ticket.estimate_upper),
            NodeEstimate::Objective(_) => None,
        }
    }
}

/// Engine output: enriched nodes in input order plus the untouched edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EstimatedGraph {
    pub nodes: Vec<EstimatedNode>,
    pub edges: Vec<Edge>,
}

impl EstimatedGraph {
    pub fn objectives(&self) -> impl Iterator<Item = &EstimatedNode> {
        self.nodes.iter().filter(|n| n.node.is_objective())
    }

    pub fn tickets(&self) -> impl Iterator<Item = &EstimatedNode> {
        self.nodes.iter().filter(|n| n.node.is_ticket())
    }

    #[allow(dead_code)] // Lookup utility
    pub fn get(&self, id: &NodeId) -> Option<&EstimatedNode> {
        self.nodes.iter().find(|n| &n.node.id == id)
    }
}

/// Portfolio-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub objectives: usize,
    pub tickets: usize,
    pub edges: usize,
    /// Sum of raw and risk-adjusted estimates over all tickets.
    pub total_points: Bounds,
    pub total_sprints: Bounds,
    pub by_risk: BTreeMap<RiskLevel, usize>,
}

/// Metadata about one estimation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Endpoint URL or file path the graph came from.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub points_per_sprint: f64,
    pub counting: CountingPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_query: Option<String>,
    pub duration_seconds: f64,
}

/// The complete estimate report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: PortfolioSummary,
    /// Objectives matching the objective filter, in graph order.
    pub objectives: Vec<EstimatedNode>,
    /// Tickets matching the ticket filter, in graph order.
    pub tickets: Vec<EstimatedNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_multipliers() {
        assert_eq!(RiskLevel::None.multiplier(), 1.0);
        assert_eq!(RiskLevel::Low.multiplier(), 1.3);
        assert_eq!(RiskLevel::Medium.multiplier(), 1.7);
        assert_eq!(RiskLevel::Large.multiplier(), 2.5);
    }

    #[test]
    fn test_risk_from_label() {
        assert_eq!(RiskLevel::from_label(Some("low")), RiskLevel::Low);
        assert_eq!(RiskLevel::from_label(Some("medium")), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_label(Some("large")), RiskLevel::Large);
        assert_eq!(RiskLevel::from_label(Some("none")), RiskLevel::None);
        assert_eq!(RiskLevel::from_label(Some("Low")), RiskLevel::None);
        assert_eq!(RiskLevel::from_label(Some(" large ")), RiskLevel::None);
        assert_eq!(RiskLevel::from_label(Some("huge")), RiskLevel::None);
        assert_eq!(RiskLevel::from_label(None), RiskLevel::None);
    }

    #[test]
    fn test_bounds_to_sprints() {
        let sprints = Bounds::new(16.0, 24.0).to_sprints(8.0);
        assert_eq!(sprints, Bounds::new(2.0, 3.0));
    }

    #[test]
    fn test_ticket_serialization() {
        let node = Node::ticket(2, "Login form", 5.0, RiskLevel::Medium);
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["id"], 2);
        assert_eq!(json["type"], "ticket");
        assert_eq!(json["estimate"], 5.0);
        assert_eq!(json["risk_level"], "medium");
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn test_estimated_objective_serialization() {
        let estimated = EstimatedNode {
            node: Node::objective(1, "Launch"),
            estimate: NodeEstimate::Objective(ObjectiveEstimate::from_points(
                Bounds::new(4.0, 8.0),
                Bounds::new(8.0, 12.0),
                4.0,
            )),
        };
        let json = serde_json::to_value(&estimated).unwrap();

        assert_eq!(json["type"], "objective");
        assert_eq!(json["name"], "Launch");
        assert_eq!(json["pointsInd"], serde_json::json!([4.0, 8.0]));
        assert_eq!(json["sprintsInd"], serde_json::json!([1.0, 2.0]));
        assert_eq!(json["pointsCumulative"], serde_json::json!([8.0, 12.0]));
        assert_eq!(json["sprintsCumulative"], serde_json::json!([2.0, 3.0]));
    }

    #[test]
    fn test_counting_policy_serde() {
        let policy: CountingPolicy = serde_json::from_str("\"distinct\"").unwrap();
        assert_eq!(policy, CountingPolicy::Distinct);
        assert_eq!(CountingPolicy::default(), CountingPolicy::PerPath);
        assert_eq!(CountingPolicy::default().to_string(), "per-path");
    }

    #[test]
    fn test_node_id_accepts_integers_and_strings() {
        let ids: Vec<NodeId> =
            serde_json::from_str(r#"[7, "3f2a9c1e-uuid", "7"]"#).unwrap();
        assert_eq!(ids[0], NodeId::Int(7));
        assert_eq!(ids[1], NodeId::from("3f2a9c1e-uuid"));
        assert_ne!(ids[0], ids[2]);
        assert_eq!(ids[1].to_string(), "3f2a9c1e-uuid");
        assert_eq!(serde_json::to_value(&ids[0]).unwrap(), serde_json::json!(7));
    }
}
