//! Local JSON file source.

use super::{GraphSource, Payload, SourceError};
use crate::models::Graph;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// Either a saved GraphQL response or the bare payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum FileContents {
    Response { data: Payload },
    Bare(Payload),
}

/// Reads the graph from a JSON file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl GraphSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Graph, SourceError> {
        info!("Reading graph from {}", self.path.display());

        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| SourceError::Io {
                    path: self.path.clone(),
                    source,
                })?;

        let payload = match serde_json::from_str::<FileContents>(&content)? {
            FileContents::Response { data } => data,
            FileContents::Bare(payload) => payload,
        };

        payload.into_graph()
    }
}
