// src/dag/graph.rs

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use petgraph::Direction;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::dag::node_status::NodeStatus;
use crate::job::{JobKind, JobSpec};
use crate::storage::Storage;

/// Edge weight: the source node depends on the target node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependsOn;

impl fmt::Display for DependsOn {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

/// Runtime node wrapping exactly one job spec.
pub struct GraphNode {
    pub(crate) spec: JobSpec,
    pub(crate) tries: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) status: NodeStatus,
    pub(crate) attempts: u32,
    pub(crate) last_attempt_at: Option<Instant>,
    pub(crate) eligible_at: Option<Instant>,
    /// Succeeded on a first check, without running the action hook.
    pub(crate) passed_initial_check: bool,
    /// The action hook ran at least once.
    pub(crate) acted: bool,
    pub(crate) last_error: Option<String>,
    /// Local store of the current (or last) attempt cycle.
    pub(crate) local: Storage,
}

impl GraphNode {
    pub(crate) fn new(spec: JobSpec, tries: u32, retry_delay: Duration) -> Self {
        let status = if spec.deps.is_empty() {
            NodeStatus::Ready
        } else {
            NodeStatus::Blocked
        };

        Self {
            spec,
            tries,
            retry_delay,
            status,
            attempts: 0,
            last_attempt_at: None,
            eligible_at: None,
            passed_initial_check: false,
            acted: false,
            last_error: None,
            local: Storage::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> JobKind {
        self.spec.kind()
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    /// Attempt cycles completed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Effective try budget (spec value, config override or engine default).
    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn last_attempt_at(&self) -> Option<Instant> {
        self.last_attempt_at
    }

    /// When an `AwaitingRetry` node may run again.
    pub fn eligible_at(&self) -> Option<Instant> {
        self.eligible_at
    }

    pub fn passed_initial_check(&self) -> bool {
        self.passed_initial_check
    }

    pub fn action_ran(&self) -> bool {
        self.acted
    }

    /// Display text of the failure that ended the last unsuccessful attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn local_storage(&self) -> &Storage {
        &self.local
    }

    fn dot_attributes(&self) -> String {
        let color = match self.status {
            NodeStatus::Success if self.acted => "darkgreen",
            NodeStatus::Success => "green",
            NodeStatus::Failed => "red",
            NodeStatus::Skipped => "gray",
            _ => return String::new(),
        };
        format!("style=filled fillcolor={color}")
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("status", &self.status)
            .field("attempts", &self.attempts)
            .field("tries", &self.tries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

/// The deduplicated, acyclic job graph of one execution.
///
/// Node indices follow discovery order (dependencies before dependents),
/// which is also the order the scheduler visits ready nodes in. The graph
/// shape never changes after construction; only node state does.
#[derive(Debug)]
pub struct ExecutionGraph {
    graph: DiGraph<GraphNode, DependsOn>,
    root: NodeIndex,
    by_name: HashMap<String, NodeIndex>,
}

impl ExecutionGraph {
    pub(crate) fn from_parts(graph: DiGraph<GraphNode, DependsOn>, root: NodeIndex) -> Self {
        let by_name = graph
            .node_indices()
            .map(|idx| (graph[idx].name().to_string(), idx))
            .collect();

        Self {
            graph,
            root,
            by_name,
        }
    }

    pub fn root(&self) -> &GraphNode {
        &self.graph[self.root]
    }

    pub fn root_index(&self) -> NodeIndex {
        self.root
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.by_name.get(name).map(|&idx| &self.graph[idx])
    }

    /// `(dependent, dependency)` name pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.graph.edge_references().map(move |edge| {
            (
                self.graph[edge.source()].name(),
                self.graph[edge.target()].name(),
            )
        })
    }

    /// Direct dependencies of `name`, in discovery order.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.named_neighbors(name, Direction::Outgoing)
    }

    /// Direct dependents of `name`, in discovery order.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.named_neighbors(name, Direction::Incoming)
    }

    fn named_neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        match self.by_name.get(name) {
            Some(&idx) => self
                .neighbor_indices(idx, direction)
                .into_iter()
                .map(|n| self.graph[n].name())
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn indices(&self) -> impl Iterator<Item = NodeIndex> + use<> {
        self.graph.node_indices()
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    pub(crate) fn node_at_mut(&mut self, idx: NodeIndex) -> &mut GraphNode {
        &mut self.graph[idx]
    }

    pub(crate) fn dependency_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbor_indices(idx, Direction::Outgoing)
    }

    pub(crate) fn dependent_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbor_indices(idx, Direction::Incoming)
    }

    fn neighbor_indices(&self, idx: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        out.sort();
        out
    }

    /// Graphviz DOT text of the graph, nodes filled by status.
    ///
    /// Green: succeeded on the first check. Dark green: succeeded after its
    /// action ran. Red: failed. Gray: skipped.
    pub fn to_dot(&self) -> String {
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[Config::EdgeNoLabel],
            &|_, _| String::new(),
            &|_, (_, node)| node.dot_attributes(),
        );
        format!("{dot}")
    }
}
