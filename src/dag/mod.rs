// src/dag/mod.rs

//! Job graph representation and scheduling.
//!
//! - [`builder`] expands a root job into an [`ExecutionGraph`].
//! - [`graph`] holds the graph and the per-node runtime state.
//! - [`scheduler`] runs rounds of attempt cycles and waits for retries.
//! - [`state_manager`] applies attempt outcomes to node states.
//! - [`scheduler_step`] defines the result types of a round.

pub mod builder;
pub mod graph;
pub mod node_status;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;

pub use builder::{BuildOptions, build_graph};
pub use graph::{ExecutionGraph, GraphNode};
pub use node_status::NodeStatus;
pub use scheduler::Scheduler;
pub use scheduler_step::{SchedulerStep, Transition};
pub use state_manager::StateManager;
