// src/engine/mod.rs

//! Public face of the orchestrator.
//!
//! [`Engine`] ties together:
//! - the graph builder (at configure time)
//! - the round-based [`Scheduler`] and its retry waits
//! - the [`CleanupUnwinder`], fed with every node whose action ran
//!
//! Ordinary job failures never surface as errors: after [`Engine::run`] the
//! only failure signal is [`Engine::succeeded`] returning `false`.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::model::{ConfigFile, JobOverride};
use crate::config::validate::{retry_delay_from_secs, validate_tries};
use crate::dag::builder::{BuildOptions, build_graph};
use crate::dag::{ExecutionGraph, NodeStatus, Scheduler};
use crate::errors::{JobdagError, Result};
use crate::job::{JobCatalog, JobId};
use crate::storage::{Arguments, Storage};
use crate::types::Verbosity;

pub mod attempt;
pub mod cleanup;

pub use cleanup::{CleanupFailure, CleanupReport, CleanupUnwinder};

/// Outcome of one attempt cycle, before retry accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded { acted: bool },
    Failed { acted: bool, error: String },
}

impl AttemptOutcome {
    /// Whether the action hook ran during the attempt.
    pub fn acted(&self) -> bool {
        match self {
            AttemptOutcome::Succeeded { acted } | AttemptOutcome::Failed { acted, .. } => *acted,
        }
    }
}

/// Engine-wide settings, frozen at configure time.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Unwind cleanup hooks at the end of [`Engine::run`].
    pub cleanup: bool,
    pub no_act: bool,
    pub default_tries: u32,
    /// Seconds.
    pub default_retry_delay: f64,
    pub verbosity: Verbosity,
    pub overrides: BTreeMap<String, JobOverride>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cleanup: true,
            no_act: false,
            default_tries: 3,
            default_retry_delay: 1.0,
            verbosity: Verbosity::Quiet,
            overrides: BTreeMap::new(),
        }
    }
}

impl EngineOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            cleanup: cfg.engine.cleanup,
            no_act: cfg.engine.no_act,
            default_tries: cfg.engine.default_tries,
            default_retry_delay: cfg.engine.default_retry_delay,
            verbosity: cfg.engine.verbosity,
            overrides: cfg.job.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_tries("default", self.default_tries)?;
        retry_delay_from_secs("default", self.default_retry_delay)?;
        Ok(())
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            default_tries: self.default_tries,
            default_retry_delay: self.default_retry_delay,
            overrides: self.overrides.clone(),
        }
    }
}

/// What [`Engine::run`] did.
#[derive(Debug)]
pub struct RunSummary {
    /// Rounds in which at least one node was visited.
    pub rounds: u64,
    pub succeeded: bool,
    pub root_status: NodeStatus,
    /// Present when cleanup ran automatically.
    pub cleanup: Option<CleanupReport>,
}

#[derive(Debug)]
pub struct Engine {
    scheduler: Scheduler,
    unwinder: CleanupUnwinder,
    options: EngineOptions,
    arguments_set: bool,
    ran: bool,
}

impl Engine {
    /// Build the graph for `root` and freeze the options.
    ///
    /// Fails with a configuration error on cycles, foreign dependencies,
    /// invalid retry policies or overrides for jobs outside the graph.
    pub fn configure(catalog: JobCatalog, root: JobId, options: EngineOptions) -> Result<Self> {
        Self::configure_with_clock(catalog, root, options, SystemClock)
    }

    pub fn configure_with(catalog: JobCatalog, root: JobId, cfg: &ConfigFile) -> Result<Self> {
        Self::configure(catalog, root, EngineOptions::from_config(cfg))
    }

    pub fn configure_with_clock<C>(
        catalog: JobCatalog,
        root: JobId,
        options: EngineOptions,
        clock: C,
    ) -> Result<Self>
    where
        C: Clock + 'static,
    {
        options.validate()?;
        let graph = build_graph(catalog, root, &options.build_options())?;
        info!(
            root = %graph.root().name(),
            nodes = graph.len(),
            no_act = options.no_act,
            cleanup = options.cleanup,
            "engine configured"
        );

        let scheduler = Scheduler::new(graph, Box::new(clock), options.no_act, options.verbosity);
        Ok(Self {
            scheduler,
            unwinder: CleanupUnwinder::new(),
            options,
            arguments_set: false,
            ran: false,
        })
    }

    /// Install the argument bundle every hook sees. Allowed once, before `run`.
    pub fn set_arguments(&mut self, args: Arguments) -> Result<()> {
        if self.ran {
            return Err(JobdagError::ConfigError(
                "arguments must be set before run()".to_string(),
            ));
        }
        if self.arguments_set {
            return Err(JobdagError::ConfigError(
                "arguments were already set".to_string(),
            ));
        }
        debug!(
            positional = args.positional().len(),
            named = args.named_values().len(),
            "arguments installed"
        );
        self.scheduler.set_arguments(args);
        self.arguments_set = true;
        Ok(())
    }

    /// Run the scheduler until the root is terminal or nothing can progress.
    ///
    /// The only error is calling it a second time.
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.ran {
            return Err(JobdagError::ConfigError("run() was already called".to_string()));
        }
        self.ran = true;

        let unwinder = &mut self.unwinder;
        let rounds = self.scheduler.run_to_completion(|step| {
            for &idx in &step.acted {
                unwinder.record(idx);
            }
        });

        let root_status = self.scheduler.graph().root().status();
        let cleanup = if self.options.cleanup {
            Some(self.cleanup())
        } else {
            None
        };

        Ok(RunSummary {
            rounds,
            succeeded: root_status == NodeStatus::Success,
            root_status,
            cleanup,
        })
    }

    /// Whether the root reached `Success`.
    pub fn succeeded(&self) -> bool {
        self.scheduler.graph().root().status() == NodeStatus::Success
    }

    /// At least one node succeeded.
    pub fn partial_success(&self) -> bool {
        self.scheduler
            .graph()
            .nodes()
            .any(|node| node.status() == NodeStatus::Success)
    }

    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    /// Run cleanup hooks, most recent action first.
    ///
    /// Nodes already cleaned up are not cleaned up again.
    pub fn cleanup(&mut self) -> CleanupReport {
        self.unwinder.unwind(&mut self.scheduler)
    }

    pub fn graph(&self) -> &ExecutionGraph {
        self.scheduler.graph()
    }

    pub fn global_storage(&self) -> &Storage {
        self.scheduler.storage().global()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn status_of(&self, job: &str) -> Option<NodeStatus> {
        self.graph().node(job).map(|node| node.status())
    }

    /// Status of every node, keyed by name.
    pub fn statuses(&self) -> BTreeMap<String, NodeStatus> {
        self.graph()
            .nodes()
            .map(|node| (node.name().to_string(), node.status()))
            .collect()
    }

    pub fn attempts_of(&self, job: &str) -> Option<u32> {
        self.graph().node(job).map(|node| node.attempts())
    }

    /// Display text of the last failure of `job`, if any.
    pub fn node_error(&self, job: &str) -> Option<&str> {
        self.graph().node(job).and_then(|node| node.last_error())
    }

    /// Nodes whose cleanup hook has not run yet.
    pub fn pending_cleanups(&self) -> usize {
        self.unwinder.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::job::{CheckFailure, JobSpec};

    fn quick() -> EngineOptions {
        EngineOptions {
            default_retry_delay: 0.0,
            ..EngineOptions::default()
        }
    }

    #[test]
    fn run_twice_is_an_error() {
        let mut catalog = JobCatalog::new();
        let root = catalog.add(JobSpec::dummy("Root")).unwrap();
        let mut engine = Engine::configure_with_clock(catalog, root, quick(), ManualClock::new()).unwrap();

        let summary = engine.run().unwrap();
        assert!(summary.succeeded);
        assert_eq!(summary.rounds, 1);
        assert!(engine.run().unwrap_err().is_configuration_error());
    }

    #[test]
    fn arguments_are_set_once_before_run() {
        let mut catalog = JobCatalog::new();
        let root = catalog
            .add(JobSpec::run_only("Root", |ctx| {
                anyhow::ensure!(ctx.args().get_str("mode") == Some("fast"), "wrong mode");
                Ok(())
            }))
            .unwrap();
        let mut engine = Engine::configure_with_clock(catalog, root, quick(), ManualClock::new()).unwrap();

        engine.set_arguments(Arguments::new().named("mode", "fast")).unwrap();
        assert!(engine.set_arguments(Arguments::new()).is_err());
        engine.run().unwrap();
        assert!(engine.succeeded());
    }

    #[test]
    fn invalid_defaults_are_rejected() {
        let mut catalog = JobCatalog::new();
        let root = catalog.add(JobSpec::dummy("Root")).unwrap();
        let options = EngineOptions {
            default_tries: 0,
            ..EngineOptions::default()
        };
        let err = Engine::configure(catalog, root, options).unwrap_err();
        assert!(matches!(err, JobdagError::InvalidTries { tries: 0, .. }));
    }

    #[test]
    fn aggregate_queries_reflect_partial_progress() {
        let mut catalog = JobCatalog::new();
        let ok = catalog.add(JobSpec::dummy("Ok")).unwrap();
        let bad = catalog
            .add(JobSpec::standard(
                "Bad",
                |_| Err(CheckFailure::not_ready("missing")),
                |_| Ok(()),
            ))
            .unwrap();
        let root = catalog.add(JobSpec::dummy("Root").after(ok).after(bad)).unwrap();
        let options = EngineOptions {
            default_tries: 2,
            ..quick()
        };
        let mut engine = Engine::configure_with_clock(catalog, root, options, ManualClock::new()).unwrap();

        let summary = engine.run().unwrap();
        assert_eq!(summary.root_status, NodeStatus::Skipped);
        assert_eq!(summary.rounds, 2);
        assert!(!engine.succeeded());
        assert!(engine.failed());
        assert!(engine.partial_success());
        assert_eq!(engine.attempts_of("Bad"), Some(2));
        assert_eq!(engine.node_error("Bad"), Some("missing"));
        assert_eq!(engine.status_of("Ok"), Some(NodeStatus::Success));
        assert_eq!(engine.statuses().len(), 3);
    }
}
