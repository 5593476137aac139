// src/dag/scheduler.rs

use std::time::Instant;

use petgraph::graph::NodeIndex;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::dag::graph::ExecutionGraph;
use crate::dag::node_status::NodeStatus;
use crate::dag::scheduler_step::{SchedulerStep, Transition};
use crate::dag::state_manager::StateManager;
use crate::engine::attempt::{AttemptEnv, run_attempt_cycle};
use crate::job::{JobContext, Phase};
use crate::storage::{Arguments, StorageManager};
use crate::types::Verbosity;

/// Scheduler holds the execution graph plus everything an attempt needs.
///
/// It is responsible for:
/// - picking the nodes that are ready at the start of a round
/// - giving each of them one attempt cycle, in discovery order
/// - recording outcomes, scheduling retries and propagating failures
/// - idling until the earliest retry when nothing is ready
#[derive(Debug)]
pub struct Scheduler {
    graph: ExecutionGraph,
    storage: StorageManager,
    args: Arguments,
    clock: Box<dyn Clock>,
    no_act: bool,
    verbosity: Verbosity,
    /// Rounds in which at least one node was visited.
    rounds: u64,
}

impl Scheduler {
    pub fn new(graph: ExecutionGraph, clock: Box<dyn Clock>, no_act: bool, verbosity: Verbosity) -> Self {
        Self {
            graph,
            storage: StorageManager::new(),
            args: Arguments::new(),
            clock,
            no_act,
            verbosity,
            rounds: 0,
        }
    }

    pub fn graph(&self) -> &ExecutionGraph {
        &self.graph
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn set_arguments(&mut self, args: Arguments) {
        self.args = args;
    }

    pub fn arguments(&self) -> &Arguments {
        &self.args
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// The root reached a terminal state, or no node can make progress.
    pub fn is_finished(&self) -> bool {
        if self.graph.root().status().is_terminal() {
            return true;
        }
        !self
            .graph
            .nodes()
            .any(|node| matches!(node.status(), NodeStatus::Ready | NodeStatus::AwaitingRetry))
    }

    /// Run one round: every node `Ready` at its start gets one attempt cycle.
    ///
    /// Nodes unblocked during the round wait for the next one. If nothing is
    /// ready, returns an idle step carrying the earliest retry time.
    pub fn run_round(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let ready = {
            let mut state = StateManager::new(&mut self.graph);
            state.promote_due_retries(self.clock.now());
            state.collect_ready()
        };

        if ready.is_empty() {
            step.idle_until = StateManager::new(&mut self.graph).earliest_retry();
            step.finished = self.is_finished();
            return step;
        }

        self.rounds += 1;
        step.round = self.rounds;
        debug!(round = self.rounds, ready = ready.len(), "starting round");

        for idx in ready {
            if self.graph.node_at(idx).status() != NodeStatus::Ready {
                continue;
            }

            let outcome = {
                let node = self.graph.node_at_mut(idx);
                let mut env = AttemptEnv {
                    args: &self.args,
                    storage: &mut self.storage,
                    clock: self.clock.as_ref(),
                    no_act: self.no_act,
                    verbosity: self.verbosity,
                };
                run_attempt_cycle(node, &mut env)
            };

            let name = self.graph.node_at(idx).name().to_string();
            if outcome.acted() {
                step.acted.push(idx);
            }

            let completed_at = self.clock.now();
            let transition = StateManager::new(&mut self.graph).record_outcome(idx, outcome, completed_at);

            match transition {
                Transition::Succeeded { unblocked } => {
                    step.succeeded.push(name.clone());
                    step.unblocked.extend(self.names(&unblocked));
                }
                Transition::RetryScheduled { .. } => step.retry_scheduled.push(name.clone()),
                Transition::Failed { skipped } => {
                    step.failed.push(name.clone());
                    step.skipped.extend(self.names(&skipped));
                }
            }
            step.visited.push(name);
        }

        step.finished = self.is_finished();
        step
    }

    /// Run rounds until [`is_finished`](Self::is_finished), idling on the
    /// clock whenever only delayed retries remain.
    ///
    /// Returns the number of non-idle rounds.
    pub fn run_to_completion<F>(&mut self, mut on_step: F) -> u64
    where
        F: FnMut(&SchedulerStep),
    {
        if self.is_finished() {
            return self.rounds;
        }

        loop {
            let step = self.run_round();
            on_step(&step);

            if step.finished {
                break;
            }

            if step.is_idle() {
                let Some(deadline) = step.idle_until else {
                    break;
                };
                debug!(wait = ?deadline.saturating_duration_since(self.clock.now()), "idle until next retry");
                self.clock.sleep_until(deadline);
            }
        }

        info!(
            rounds = self.rounds,
            root = %self.graph.root().name(),
            status = %self.graph.root().status(),
            "scheduler finished"
        );
        self.rounds
    }

    /// Call the cleanup hook of `idx`, if it has one.
    ///
    /// The hook sees the local store of the node's last attempt.
    pub(crate) fn run_cleanup_hook(&mut self, idx: NodeIndex) -> Option<anyhow::Result<()>> {
        let node = self.graph.node_at_mut(idx);
        let attempt = node.attempts;
        let crate::dag::graph::GraphNode { spec, local, .. } = node;
        let hook = spec.cleanup.as_mut()?;

        let mut ctx = JobContext::new(
            &spec.name,
            Phase::Cleanup,
            attempt,
            &self.args,
            self.storage.global_mut(),
            local,
            self.clock.as_ref(),
        );
        Some(hook(&mut ctx))
    }

    fn names(&self, indices: &[NodeIndex]) -> Vec<String> {
        indices
            .iter()
            .map(|&idx| self.graph.node_at(idx).name().to_string())
            .collect()
    }
}
