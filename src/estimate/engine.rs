//! Dependency-graph traversal and range computation.
//!
//! For every objective two breadth-first walks run over the incoming
//! (prerequisite) edges: a *direct* walk that only steps onto tickets and a
//! *cumulative* walk that steps through any node. Each walk owns its
//! frontier and visited set, so objectives can be processed independently
//! against the same read-only index.

use crate::estimate::EstimateError;
use crate::models::{
    Bounds, CountingPolicy, EstimatedGraph, EstimatedNode, Graph, Node, NodeEstimate, NodeId,
    NodeKind, ObjectiveEstimate, RiskLevel, TicketEstimate,
};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// Tunables for one estimation run.
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    /// Capacity used to convert points into sprints.
    pub points_per_sprint: f64,
    /// How tickets reached through several paths are counted.
    pub counting: CountingPolicy,
    /// Maximum edges a single walk may pop before giving up.
    pub max_steps: Option<usize>,
    /// Fan objectives out across the rayon pool.
    pub parallel: bool,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            points_per_sprint: 16.0,
            counting: CountingPolicy::PerPath,
            max_steps: None,
            parallel: false,
        }
    }
}

/// Risk-adjusted upper bound of a ticket estimate.
pub fn upper_bound(estimate: f64, risk: RiskLevel) -> f64 {
    estimate * risk.multiplier()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Only ticket prerequisites are followed.
    Direct,
    /// Every prerequisite is followed.
    Cumulative,
}

/// Read-only adjacency built once per run and shared by every walk.
struct GraphIndex<'a> {
    nodes: &'a [Node],
    /// Per node position: positions of its prerequisites, one entry per edge.
    incoming: Vec<Vec<usize>>,
    /// Per node position: risk-adjusted estimate (zero for objectives).
    upper: Vec<f64>,
}

impl<'a> GraphIndex<'a> {
    fn build(graph: &'a Graph) -> Result<Self, EstimateError> {
        let mut positions: HashMap<&NodeId, usize> = HashMap::with_capacity(graph.nodes.len());
        for (pos, node) in graph.nodes.iter().enumerate() {
            if positions.insert(&node.id, pos).is_some() {
                return Err(EstimateError::DuplicateNode {
                    id: node.id.clone(),
                });
            }
        }

        let lookup = |id: &NodeId| {
            positions
                .get(id)
                .copied()
                .ok_or_else(|| EstimateError::DataIntegrity { id: id.clone() })
        };

        let mut incoming = vec![Vec::new(); graph.nodes.len()];
        for edge in &graph.edges {
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            incoming[to].push(from);
        }

        let upper = graph
            .nodes
            .iter()
            .map(|node| match node.kind {
                NodeKind::Ticket { estimate, risk } => upper_bound(estimate, risk),
                NodeKind::Objective => 0.0,
            })
            .collect();

        Ok(Self {
            nodes: &graph.nodes,
            incoming,
            upper,
        })
    }

    fn admits(&self, scope: Scope, pos: usize) -> bool {
        scope == Scope::Cumulative || self.nodes[pos].is_ticket()
    }

    /// Count one walk step against the configured budget.
    fn charge(
        &self,
        steps: &mut usize,
        root: usize,
        options: &EstimateOptions,
    ) -> Result<(), EstimateError> {
        *steps += 1;
        match options.max_steps {
            Some(budget) if *steps > budget => Err(EstimateError::TraversalBudgetExceeded {
                objective: self.nodes[root].id.clone(),
                budget,
            }),
            _ => Ok(()),
        }
    }

    fn walk(
        &self,
        root: usize,
        scope: Scope,
        options: &EstimateOptions,
    ) -> Result<Bounds, EstimateError> {
        match options.counting {
            CountingPolicy::Distinct => self.walk_distinct(root, scope, options),
            CountingPolicy::PerPath => self.walk_paths(root, scope, options),
        }
    }

    /// Breadth-first walk summing every reachable ticket once.
    fn walk_distinct(
        &self,
        root: usize,
        scope: Scope,
        options: &EstimateOptions,
    ) -> Result<Bounds, EstimateError> {
        let admitted = |from: &usize| self.admits(scope, *from);

        let mut frontier: VecDeque<usize> =
            self.incoming[root].iter().copied().filter(admitted).collect();
        let mut seen = HashSet::from([root]);
        let mut steps = 0usize;
        let mut sum = Bounds::ZERO;

        while let Some(from) = frontier.pop_front() {
            self.charge(&mut steps, root, options)?;
            if !seen.insert(from) {
                continue;
            }

            if let NodeKind::Ticket { estimate, .. } = self.nodes[from].kind {
                sum.low += estimate;
                sum.high += self.upper[from];
            }

            frontier.extend(self.incoming[from].iter().copied().filter(admitted));
        }

        Ok(sum)
    }

    /// Sum every reachable ticket once per distinct edge path to `root`.
    ///
    /// Path counts are propagated in topological order over the reachable
    /// sub-graph; a cycle makes the count unbounded and is reported instead.
    fn walk_paths(
        &self,
        root: usize,
        scope: Scope,
        options: &EstimateOptions,
    ) -> Result<Bounds, EstimateError> {
        let mut reached = HashSet::from([root]);
        let mut frontier = VecDeque::from([root]);
        // (prerequisite, dependent) for every admitted edge, duplicates kept
        let mut sub_edges: Vec<(usize, usize)> = Vec::new();
        let mut steps = 0usize;

        while let Some(pos) = frontier.pop_front() {
            for &from in &self.incoming[pos] {
                if !self.admits(scope, from) {
                    continue;
                }
                self.charge(&mut steps, root, options)?;
                sub_edges.push((from, pos));
                if reached.insert(from) {
                    frontier.push_back(from);
                }
            }
        }

        // A node is ready once all of its dependents inside the sub-graph are.
        let mut pending: HashMap<usize, usize> = HashMap::with_capacity(reached.len());
        let mut prerequisites: HashMap<usize, Vec<usize>> = HashMap::new();
        for &(from, to) in &sub_edges {
            *pending.entry(from).or_default() += 1;
            prerequisites.entry(to).or_default().push(from);
        }

        let cycle = || EstimateError::CycleDetected {
            objective: self.nodes[root].id.clone(),
        };
        if pending.contains_key(&root) {
            return Err(cycle());
        }

        let mut paths: HashMap<usize, f64> = HashMap::from([(root, 1.0)]);
        let mut ready = VecDeque::from([root]);
        let mut processed = 0usize;
        let mut sum = Bounds::ZERO;

        while let Some(pos) = ready.pop_front() {
            processed += 1;
            let count = paths.get(&pos).copied().unwrap_or(0.0);

            if let NodeKind::Ticket { estimate, .. } = self.nodes[pos].kind {
                sum.low += count * estimate;
                sum.high += count * self.upper[pos];
            }

            for &from in prerequisites.get(&pos).into_iter().flatten() {
                *paths.entry(from).or_default() += count;
                if let Some(left) = pending.get_mut(&from) {
                    *left -= 1;
                    if *left == 0 {
                        ready.push_back(from);
                    }
                }
            }
        }

        if processed < reached.len() {
            return Err(cycle());
        }

        Ok(sum)
    }

    fn estimate_node(
        &self,
        pos: usize,
        options: &EstimateOptions,
    ) -> Result<EstimatedNode, EstimateError> {
        let node = &self.nodes[pos];

        let estimate = match node.kind {
            NodeKind::Ticket { .. } => NodeEstimate::Ticket(TicketEstimate {
                estimate_upper: self.upper[pos],
            }),
            NodeKind::Objective => {
                let individual = self.walk(pos, Scope::Direct, options)?;
                let cumulative = self.walk(pos, Scope::Cumulative, options)?;
                debug!(
                    "Objective {}: individual {:?}, cumulative {:?}",
                    node.id, individual, cumulative
                );
                NodeEstimate::Objective(ObjectiveEstimate::from_points(
                    individual,
                    cumulative,
                    options.points_per_sprint,
                ))
            }
        };

        Ok(EstimatedNode {
            node: node.clone(),
            estimate,
        })
    }
}

/// Compute risk-adjusted bounds for every ticket and point/sprint ranges
/// for every objective.
///
/// Nodes come back in input order and the edges are returned unchanged.
/// Any structural error aborts the whole run.
pub fn compute_estimates(
    graph: &Graph,
    options: &EstimateOptions,
) -> Result<EstimatedGraph, EstimateError> {
    let capacity = options.points_per_sprint;
    if !capacity.is_finite() || capacity <= 0.0 {
        return Err(EstimateError::InvalidCapacity(capacity));
    }

    let index = GraphIndex::build(graph)?;
    info!(
        "Estimating {} nodes over {} edges ({} counting, {} points/sprint)",
        graph.nodes.len(),
        graph.edges.len(),
        options.counting,
        capacity
    );

    let estimate = |pos: usize| index.estimate_node(pos, options);
    let nodes = if options.parallel {
        (0..graph.nodes.len())
            .into_par_iter()
            .map(estimate)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        (0..graph.nodes.len())
            .map(estimate)
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok(EstimatedGraph {
        nodes,
        edges: graph.edges.clone(),
    })
}
