//! Estimation errors.

use crate::models::NodeId;

/// Errors that abort an estimation run. No partial results are produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimateError {
    #[error("edge references unknown node {id}")]
    DataIntegrity { id: NodeId },

    #[error("node id {id} appears more than once")]
    DuplicateNode { id: NodeId },

    #[error("traversal from objective {objective} exceeded the budget of {budget} steps")]
    TraversalBudgetExceeded { objective: NodeId, budget: usize },

    #[error("dependency cycle below objective {objective} makes path counts unbounded")]
    CycleDetected { objective: NodeId },

    #[error("points per sprint must be a positive number, got {0}")]
    InvalidCapacity(f64),
}
