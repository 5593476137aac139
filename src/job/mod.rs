// src/job/mod.rs

//! Job definitions.
//!
//! - [`spec`] holds [`JobSpec`], the static description of one job: its
//!   hooks, kind, dependencies and retry policy.
//! - [`context`] is what a hook sees while it runs: arguments, storage and
//!   which phase it was called for.
//! - [`catalog`] collects specs and dependency edges until the engine is
//!   configured and the catalog is consumed.

pub mod catalog;
pub mod context;
pub mod spec;

pub use catalog::{JobCatalog, JobId};
pub use context::{JobContext, Phase};
pub use spec::{CheckFailure, CheckResult, JobKind, JobSpec};
