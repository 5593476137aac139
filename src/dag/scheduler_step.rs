// src/dag/scheduler_step.rs

//! Result types for scheduler rounds.

use std::time::Instant;

use petgraph::graph::NodeIndex;

/// What recording an attempt outcome did to the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Node succeeded; these dependents became `Ready`.
    Succeeded { unblocked: Vec<NodeIndex> },
    /// Node failed with tries left; it may run again at `eligible_at`.
    RetryScheduled { eligible_at: Instant },
    /// Try budget exhausted; these transitive dependents became `Skipped`.
    Failed { skipped: Vec<NodeIndex> },
}

/// Structured result of a single scheduler round.
///
/// Useful for tests that step the scheduler by hand and make assertions
/// about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// 1-based number of this round; 0 if nothing was ready.
    pub round: u64,
    /// Nodes given an attempt cycle this round, in visit order.
    pub visited: Vec<String>,
    pub succeeded: Vec<String>,
    /// Nodes whose dependencies all succeeded during this round.
    pub unblocked: Vec<String>,
    pub retry_scheduled: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    /// Nodes whose action hook ran this round.
    pub acted: Vec<NodeIndex>,
    /// Nothing was ready: the earliest time a waiting node becomes eligible.
    pub idle_until: Option<Instant>,
    /// The scheduler has nothing left to do after this round.
    pub finished: bool,
}

impl SchedulerStep {
    pub fn is_idle(&self) -> bool {
        self.visited.is_empty()
    }
}
