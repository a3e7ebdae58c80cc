//! GraphQL endpoint source.

use super::{GraphSource, Payload, SourceError};
use crate::models::Graph;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// The query issued against the estimator backend.
pub const OVERVIEW_QUERY: &str = r#"
  query overview {
    nodes(order_by: {order: asc}) {
      id
      name
      type
      estimate
      risk_level
      order
      tags
    }
    edges {
      from
      to
    }
  }
"#;

const ROLE_HEADER: &str = "X-Hasura-Role";

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Payload>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

/// Fetches the graph from a GraphQL endpoint.
pub struct GraphqlSource {
    endpoint: String,
    role: String,
    timeout_seconds: u64,
    show_progress: bool,
    http_client: reqwest::Client,
}

impl GraphqlSource {
    pub fn new(
        endpoint: impl Into<String>,
        role: impl Into<String>,
        timeout_seconds: u64,
        show_progress: bool,
    ) -> Result<Self, SourceError> {
        let endpoint = endpoint.into();
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|source| SourceError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        Ok(Self {
            endpoint,
            role: role.into(),
            timeout_seconds,
            show_progress,
            http_client,
        })
    }

    async fn send(&self) -> Result<String, SourceError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(ROLE_HEADER, &self.role)
            .json(&GraphqlRequest {
                query: OVERVIEW_QUERY,
            })
            .send()
            .await
            .map_err(|source| SourceError::Http {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| SourceError::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// Decode a GraphQL response body into the overview payload.
pub(crate) fn decode_response(body: &str) -> Result<Payload, SourceError> {
    let response: GraphqlResponse = serde_json::from_str(body)?;

    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(SourceError::GraphQl(messages.join("; ")));
    }

    response.data.ok_or(SourceError::MissingData)
}

#[async_trait]
impl GraphSource for GraphqlSource {
    fn describe(&self) -> String {
        self.endpoint.clone()
    }

    async fn fetch(&self) -> Result<Graph, SourceError> {
        info!(
            "Querying {} as role '{}' (timeout {}s)",
            self.endpoint, self.role, self.timeout_seconds
        );

        let spinner = if self.show_progress {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(format!("Fetching graph from {}", self.endpoint));
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        let result = self.send().await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let body = result?;
        debug!("Received {} bytes", body.len());
        decode_response(&body)?.into_graph()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_response_data() {
        let body = r#"{
            "data": {
                "nodes": [{"id": 1, "name": "Launch", "type": "objective", "order": 1, "tags": null}],
                "edges": []
            }
        }"#;

        let payload = decode_response(body).unwrap();
        assert_eq!(payload.nodes.len(), 1);
        assert_eq!(payload.nodes[0].name.as_deref(), Some("Launch"));
    }

    #[test]
    fn test_decode_response_errors() {
        let body = r#"{"errors": [{"message": "field 'nodes' not found"}, {"message": "denied"}]}"#;

        match decode_response(body) {
            Err(SourceError::GraphQl(msg)) => {
                assert!(msg.contains("field 'nodes' not found"));
                assert!(msg.contains("denied"));
            }
            other => panic!("expected GraphQL error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_response_without_data() {
        assert!(matches!(
            decode_response("{}"),
            Err(SourceError::MissingData)
        ));
        assert!(matches!(
            decode_response("not json"),
            Err(SourceError::Json(_))
        ));
    }

    #[test]
    fn test_overview_query_fields() {
        for field in ["id", "name", "type", "estimate", "risk_level", "order", "tags", "from", "to"] {
            assert!(OVERVIEW_QUERY.contains(field));
        }
        assert!(OVERVIEW_QUERY.contains("order_by: {order: asc}"));
    }

    #[test]
    fn test_new_keeps_endpoint() {
        let source = GraphqlSource::new("http://localhost:8080/v1/graphql", "app", 5, false).unwrap();
        assert_eq!(source.describe(), "http://localhost:8080/v1/graphql");
    }
}
