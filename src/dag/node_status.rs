// src/dag/node_status.rs

//! Per-node lifecycle states.

use std::fmt;

/// Where a node is in its lifecycle.
///
/// ```text
/// Blocked -> Ready -> Checking -> Success
///                        |
///                        v
///                   NeedsAction -> Running -> Rechecking -> Success
///                                                 |
///                                                 v
///                          Ready <- AwaitingRetry | Failed
/// ```
///
/// Dependents of a `Failed` or `Skipped` node become `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Waiting on at least one dependency that has not succeeded yet.
    Blocked,
    /// Dependencies satisfied; will be visited in the next round.
    Ready,
    Checking,
    /// The first check failed; the action hook is next.
    NeedsAction,
    Running,
    Rechecking,
    /// The last attempt failed and tries remain; waiting out the retry delay.
    AwaitingRetry,
    Success,
    /// Try budget exhausted.
    Failed,
    /// A dependency failed or was skipped, so this node never ran.
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Success | NodeStatus::Failed | NodeStatus::Skipped
        )
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Blocked => "blocked",
            NodeStatus::Ready => "ready",
            NodeStatus::Checking => "checking",
            NodeStatus::NeedsAction => "needs-action",
            NodeStatus::Running => "running",
            NodeStatus::Rechecking => "rechecking",
            NodeStatus::AwaitingRetry => "awaiting-retry",
            NodeStatus::Success => "success",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
        };
        f.pad(s)
    }
}
