// src/engine/cleanup.rs

//! LIFO unwinding of cleanup hooks.

use petgraph::graph::NodeIndex;
use tracing::{debug, info, warn};

use crate::dag::Scheduler;

/// A cleanup hook that returned an error. The unwind carries on regardless.
#[derive(Debug)]
pub struct CleanupFailure {
    pub job: String,
    pub error: anyhow::Error,
}

/// What one unwind did.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Jobs whose cleanup hook ran, in the order they ran.
    pub ran: Vec<String>,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Records nodes in the order their action first executed and unwinds
/// them in reverse.
#[derive(Debug, Default)]
pub struct CleanupUnwinder {
    sequence: Vec<NodeIndex>,
}

impl CleanupUnwinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `idx` unless it is already recorded.
    pub fn record(&mut self, idx: NodeIndex) {
        if !self.sequence.contains(&idx) {
            self.sequence.push(idx);
        }
    }

    /// Number of nodes waiting to be cleaned up.
    pub fn pending(&self) -> usize {
        self.sequence.len()
    }

    /// Invoke cleanup hooks, most recent action first.
    ///
    /// Drains the sequence: a second call only sees nodes recorded since.
    pub fn unwind(&mut self, scheduler: &mut Scheduler) -> CleanupReport {
        let mut report = CleanupReport::default();
        let sequence = std::mem::take(&mut self.sequence);

        for idx in sequence.into_iter().rev() {
            let job = scheduler.graph().node_at(idx).name().to_string();
            let Some(result) = scheduler.run_cleanup_hook(idx) else {
                debug!(job = %job, "no cleanup hook");
                continue;
            };

            match result {
                Ok(()) => debug!(job = %job, "cleanup done"),
                Err(error) => {
                    warn!(job = %job, error = %format!("{error:#}"), "cleanup failed; continuing");
                    report.failures.push(CleanupFailure {
                        job: job.clone(),
                        error,
                    });
                }
            }
            report.ran.push(job);
        }

        info!(ran = report.ran.len(), failures = report.failures.len(), "cleanup finished");
        report
    }
}
