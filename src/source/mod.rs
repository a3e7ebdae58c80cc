//! Graph data sources.
//!
//! A source delivers the raw node/edge payload of the `overview` query and
//! converts it into the closed [`Graph`] model the engine works on. Two
//! implementations exist:
//! - [`GraphqlSource`] posts the query to a GraphQL endpoint
//! - [`FileSource`] reads a saved response or bare payload from disk

mod file;
mod graphql;

pub use file::FileSource;
pub use graphql::GraphqlSource;

use crate::models::{Edge, Graph, Node, NodeId, NodeKind, RiskLevel};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use tracing::debug;

/// Errors raised while fetching or validating a graph payload.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("response carried no data")]
    MissingData,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid graph payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node {id} has unknown type '{node_type}'")]
    UnknownNodeType { id: NodeId, node_type: String },

    #[error("ticket {id} has no numeric estimate")]
    MissingEstimate { id: NodeId },
}

/// Anything that can deliver the dependency graph.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Human-readable origin, used in logs and report metadata.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Graph, SourceError>;
}

/// A node as delivered by the query, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: NodeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, deserialize_with = "deserialize_estimate")]
    pub estimate: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEdge {
    pub from: NodeId,
    pub to: NodeId,
}

/// The `data` object of the `overview` query.
#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

/// Estimates may arrive as numbers or as numeric strings.
fn deserialize_estimate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Estimate {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Estimate>::deserialize(deserializer)? {
        Some(Estimate::Number(n)) => Some(n),
        Some(Estimate::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

impl RawNode {
    fn into_node(self) -> Result<Node, SourceError> {
        let id = self.id;
        let kind = match self.node_type.trim().to_lowercase().as_str() {
            "objective" => NodeKind::Objective,
            "ticket" => NodeKind::Ticket {
                estimate: self
                    .estimate
                    .filter(|e| e.is_finite())
                    .ok_or_else(|| SourceError::MissingEstimate { id: id.clone() })?,
                risk: RiskLevel::from_label(self.risk_level.as_deref()),
            },
            _ => {
                return Err(SourceError::UnknownNodeType {
                    id,
                    node_type: self.node_type,
                })
            }
        };

        Ok(Node {
            id,
            name: self.name.unwrap_or_default(),
            order: self.order,
            tags: self.tags.unwrap_or_default(),
            kind,
        })
    }
}

impl Payload {
    /// Validate every node and order them by `order`, unordered nodes last.
    pub fn into_graph(self) -> Result<Graph, SourceError> {
        let mut nodes = self
            .nodes
            .into_iter()
            .map(RawNode::into_node)
            .collect::<Result<Vec<_>, _>>()?;
        nodes.sort_by_key(|n| (n.order.is_none(), n.order));

        let edges: Vec<Edge> = self
            .edges
            .into_iter()
            .map(|e| Edge {
                from: e.from,
                to: e.to,
            })
            .collect();

        debug!("Decoded {} nodes and {} edges", nodes.len(), edges.len());
        Ok(Graph { nodes, edges })
    }
}
