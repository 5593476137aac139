// src/dag/state_manager.rs

//! Node state transitions: readiness, retry accounting and failure
//! propagation.

use std::collections::HashSet;
use std::time::Instant;

use petgraph::graph::NodeIndex;
use tracing::{debug, info, warn};

use crate::dag::graph::ExecutionGraph;
use crate::dag::node_status::NodeStatus;
use crate::dag::scheduler_step::Transition;
use crate::engine::AttemptOutcome;

/// Manages state transitions for the nodes of one graph.
pub struct StateManager<'a> {
    graph: &'a mut ExecutionGraph,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a mut ExecutionGraph) -> Self {
        Self { graph }
    }

    /// Whether every dependency of `idx` has succeeded.
    pub fn deps_satisfied(&self, idx: NodeIndex) -> bool {
        self.graph
            .dependency_indices(idx)
            .into_iter()
            .all(|dep| self.graph.node_at(dep).status == NodeStatus::Success)
    }

    /// Move `AwaitingRetry` nodes whose delay has elapsed back to `Ready`.
    pub fn promote_due_retries(&mut self, now: Instant) -> Vec<NodeIndex> {
        let due: Vec<NodeIndex> = self
            .graph
            .indices()
            .filter(|&idx| {
                let node = self.graph.node_at(idx);
                node.status == NodeStatus::AwaitingRetry
                    && node.eligible_at.is_none_or(|at| at <= now)
            })
            .collect();

        for &idx in &due {
            let node = self.graph.node_at_mut(idx);
            node.status = NodeStatus::Ready;
            node.eligible_at = None;
            debug!(job = %node.name(), attempts = node.attempts, "retry delay elapsed; Ready");
        }

        due
    }

    /// `Ready` nodes in discovery order.
    pub fn collect_ready(&self) -> Vec<NodeIndex> {
        self.graph
            .indices()
            .filter(|&idx| self.graph.node_at(idx).status == NodeStatus::Ready)
            .collect()
    }

    /// Earliest eligibility time among `AwaitingRetry` nodes.
    pub fn earliest_retry(&self) -> Option<Instant> {
        self.graph
            .nodes()
            .filter(|node| node.status == NodeStatus::AwaitingRetry)
            .filter_map(|node| node.eligible_at)
            .min()
    }

    /// Apply the outcome of one attempt cycle of `idx`, completed at
    /// `completed_at`.
    pub fn record_outcome(
        &mut self,
        idx: NodeIndex,
        outcome: AttemptOutcome,
        completed_at: Instant,
    ) -> Transition {
        let node = self.graph.node_at_mut(idx);
        node.attempts += 1;
        node.last_attempt_at = Some(completed_at);

        match outcome {
            AttemptOutcome::Succeeded { .. } => {
                node.status = NodeStatus::Success;
                node.last_error = None;
                debug!(job = %node.name(), attempts = node.attempts, "job succeeded");
                let unblocked = self.mark_succeeded(idx);
                Transition::Succeeded { unblocked }
            }
            AttemptOutcome::Failed { error, .. } => {
                node.last_error = Some(error);

                let retry_at = if node.attempts < node.tries {
                    completed_at.checked_add(node.retry_delay)
                } else {
                    None
                };

                if let Some(eligible_at) = retry_at {
                    node.status = NodeStatus::AwaitingRetry;
                    node.eligible_at = Some(eligible_at);
                    info!(
                        job = %node.name(),
                        attempt = node.attempts,
                        tries = node.tries,
                        delay = ?node.retry_delay,
                        "attempt failed; retry scheduled"
                    );
                    return Transition::RetryScheduled { eligible_at };
                }

                if node.attempts < node.tries {
                    // The delay overflows the clock, so the retry can never happen.
                    let cause = node.last_error.take().unwrap_or_default();
                    node.last_error = Some(format!(
                        "{cause} (retry delay of {:?} is beyond the clock's range)",
                        node.retry_delay
                    ));
                }

                node.status = NodeStatus::Failed;
                node.eligible_at = None;
                warn!(
                    job = %node.name(),
                    attempts = node.attempts,
                    error = node.last_error.as_deref().unwrap_or_default(),
                    "job failed permanently; skipping dependents"
                );
                let skipped = self.mark_dependents_skipped(idx);
                Transition::Failed { skipped }
            }
        }
    }

    /// Unblock dependents of a node that just succeeded.
    ///
    /// Returns the dependents that became `Ready`.
    pub fn mark_succeeded(&mut self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut unblocked = Vec::new();

        for dependent in self.graph.dependent_indices(idx) {
            if self.graph.node_at(dependent).status == NodeStatus::Blocked
                && self.deps_satisfied(dependent)
            {
                let node = self.graph.node_at_mut(dependent);
                node.status = NodeStatus::Ready;
                debug!(job = %node.name(), "dependencies satisfied; Ready");
                unblocked.push(dependent);
            }
        }

        unblocked
    }

    /// Mark every non-terminal transitive dependent of `failed` as `Skipped`.
    ///
    /// Returns the newly skipped nodes (excluding `failed` itself).
    pub fn mark_dependents_skipped(&mut self, failed: NodeIndex) -> Vec<NodeIndex> {
        let mut stack = self.graph.dependent_indices(failed);
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut skipped = Vec::new();

        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }

            let node = self.graph.node_at_mut(idx);
            if node.status.is_terminal() {
                continue;
            }

            node.status = NodeStatus::Skipped;
            node.eligible_at = None;
            debug!(job = %node.name(), "upstream failure; Skipped");
            skipped.push(idx);
            stack.extend(self.graph.dependent_indices(idx));
        }

        skipped.sort();
        skipped
    }

    /// Whether some node is `Ready` now or will be once its delay elapses.
    pub fn has_pending_work(&self) -> bool {
        self.graph.nodes().any(|node| {
            matches!(node.status, NodeStatus::Ready | NodeStatus::AwaitingRetry)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::builder::{BuildOptions, build_graph};
    use crate::job::{JobCatalog, JobSpec};
    use std::time::Duration;

    /// A <- B <- C, plus D independent, all under Root.
    fn graph(tries: u32, delay: f64) -> ExecutionGraph {
        let mut catalog = JobCatalog::new();
        let a = catalog.add(JobSpec::dummy("A")).unwrap();
        let b = catalog.add(JobSpec::dummy("B").after(a)).unwrap();
        let c = catalog.add(JobSpec::dummy("C").after(b)).unwrap();
        let d = catalog.add(JobSpec::dummy("D")).unwrap();
        let root = catalog.add(JobSpec::dummy("Root").after(c).after(d)).unwrap();

        let options = BuildOptions {
            default_tries: tries,
            default_retry_delay: delay,
            ..BuildOptions::default()
        };
        build_graph(catalog, root, &options).unwrap()
    }

    fn failed() -> AttemptOutcome {
        AttemptOutcome::Failed {
            acted: true,
            error: "boom".to_string(),
        }
    }

    #[test]
    fn success_unblocks_dependents_once_all_deps_succeed() {
        let mut g = graph(1, 0.0);
        let now = Instant::now();
        let a = g.index_of("A").unwrap();
        let b = g.index_of("B").unwrap();

        let mut manager = StateManager::new(&mut g);
        let transition = manager.record_outcome(a, AttemptOutcome::Succeeded { acted: false }, now);

        assert_eq!(transition, Transition::Succeeded { unblocked: vec![b] });
        assert_eq!(g.node("B").unwrap().status(), NodeStatus::Ready);
        assert_eq!(g.node("Root").unwrap().status(), NodeStatus::Blocked);
    }

    #[test]
    fn failure_with_tries_left_schedules_retry_after_delay() {
        let mut g = graph(2, 5.0);
        let now = Instant::now();
        let a = g.index_of("A").unwrap();

        let mut manager = StateManager::new(&mut g);
        let transition = manager.record_outcome(a, failed(), now);
        assert_eq!(
            transition,
            Transition::RetryScheduled {
                eligible_at: now + Duration::from_secs(5)
            }
        );

        assert!(manager.promote_due_retries(now + Duration::from_secs(4)).is_empty());
        assert_eq!(manager.earliest_retry(), Some(now + Duration::from_secs(5)));
        assert_eq!(manager.promote_due_retries(now + Duration::from_secs(5)), vec![a]);
        assert_eq!(g.node("A").unwrap().status(), NodeStatus::Ready);
        assert_eq!(g.node("A").unwrap().last_error(), Some("boom"));
    }

    #[test]
    fn unreachable_retry_time_fails_permanently() {
        let mut g = graph(2, 1e19);
        let now = Instant::now();
        let a = g.index_of("A").unwrap();

        let mut manager = StateManager::new(&mut g);
        let transition = manager.record_outcome(a, failed(), now);

        assert!(matches!(transition, Transition::Failed { .. }));
        assert_eq!(manager.earliest_retry(), None);
        let node = g.node("A").unwrap();
        assert_eq!(node.status(), NodeStatus::Failed);
        assert_eq!(node.attempts(), 1);
        assert!(node.last_error().is_some_and(|e| e.starts_with("boom (retry delay")));
        assert_eq!(g.node("Root").unwrap().status(), NodeStatus::Skipped);
    }

    #[test]
    fn exhausted_budget_fails_and_skips_transitive_dependents() {
        let mut g = graph(1, 0.0);
        let now = Instant::now();
        let a = g.index_of("A").unwrap();
        let expected: Vec<NodeIndex> = ["B", "C", "Root"]
            .iter()
            .map(|n| g.index_of(n).unwrap())
            .collect();

        let mut manager = StateManager::new(&mut g);
        let transition = manager.record_outcome(a, failed(), now);

        assert_eq!(transition, Transition::Failed { skipped: expected });
        assert!(manager.has_pending_work());
        assert_eq!(g.node("D").unwrap().status(), NodeStatus::Ready);
        assert_eq!(g.node("A").unwrap().status(), NodeStatus::Failed);
        assert_eq!(g.node("Root").unwrap().status(), NodeStatus::Skipped);
    }
}
