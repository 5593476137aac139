// src/job/spec.rs

//! Static job descriptions.

use std::fmt;

use thiserror::Error;

use crate::job::catalog::JobId;
use crate::job::context::JobContext;

/// Why a check hook reported "not in the desired state".
///
/// A failed check is expected, not exceptional: on the first check it
/// triggers the action hook, on the recheck it fails the attempt.
#[derive(Debug, Error)]
pub enum CheckFailure {
    #[error("{0}")]
    NotReady(String),

    #[error(transparent)]
    Error(#[from] anyhow::Error),
}

impl CheckFailure {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        CheckFailure::NotReady(reason.into())
    }
}

/// `Ok(())` means the desired state already holds.
pub type CheckResult = Result<(), CheckFailure>;

pub type CheckHook = Box<dyn FnMut(&mut JobContext<'_>) -> CheckResult + Send>;
pub type RunHook = Box<dyn FnMut(&mut JobContext<'_>) -> anyhow::Result<()> + Send>;
pub type CleanupHook = Box<dyn FnMut(&mut JobContext<'_>) -> anyhow::Result<()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// check, then run + recheck if the check failed.
    Standard,
    /// No hooks; succeeds as soon as its dependencies have.
    DummyOnly,
    /// Only an action hook; success means it returned `Ok`.
    RunOnly,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobKind::Standard => "standard",
            JobKind::DummyOnly => "dummy",
            JobKind::RunOnly => "run-only",
        };
        f.write_str(s)
    }
}

pub(crate) enum Hooks {
    Standard { check: CheckHook, run: RunHook },
    DummyOnly,
    RunOnly { run: RunHook },
}

impl Hooks {
    fn kind(&self) -> JobKind {
        match self {
            Hooks::Standard { .. } => JobKind::Standard,
            Hooks::DummyOnly => JobKind::DummyOnly,
            Hooks::RunOnly { .. } => JobKind::RunOnly,
        }
    }
}

/// Description of one job: name, hooks, dependencies and retry policy.
///
/// `tries` and `retry_delay` left unset fall back to the engine defaults.
/// Out-of-range values are rejected when the graph is built.
pub struct JobSpec {
    pub(crate) name: String,
    pub(crate) hooks: Hooks,
    pub(crate) cleanup: Option<CleanupHook>,
    pub(crate) deps: Vec<JobId>,
    pub(crate) tries: Option<u32>,
    pub(crate) retry_delay: Option<f64>,
}

impl JobSpec {
    fn with_hooks(name: impl Into<String>, hooks: Hooks) -> Self {
        Self {
            name: name.into(),
            hooks,
            cleanup: None,
            deps: Vec::new(),
            tries: None,
            retry_delay: None,
        }
    }

    pub fn standard<C, R>(name: impl Into<String>, check: C, run: R) -> Self
    where
        C: FnMut(&mut JobContext<'_>) -> CheckResult + Send + 'static,
        R: FnMut(&mut JobContext<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        Self::with_hooks(
            name,
            Hooks::Standard {
                check: Box::new(check),
                run: Box::new(run),
            },
        )
    }

    pub fn dummy(name: impl Into<String>) -> Self {
        Self::with_hooks(name, Hooks::DummyOnly)
    }

    pub fn run_only<R>(name: impl Into<String>, run: R) -> Self
    where
        R: FnMut(&mut JobContext<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        Self::with_hooks(name, Hooks::RunOnly { run: Box::new(run) })
    }

    /// Declare a dependency. Declaring the same dependency twice is a no-op.
    pub fn after(mut self, dep: JobId) -> Self {
        if !self.deps.contains(&dep) {
            self.deps.push(dep);
        }
        self
    }

    pub fn after_all(self, deps: impl IntoIterator<Item = JobId>) -> Self {
        deps.into_iter().fold(self, JobSpec::after)
    }

    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = Some(tries);
        self
    }

    /// Minimum spacing, in seconds, between two attempts of this job.
    pub fn with_retry_delay(mut self, seconds: f64) -> Self {
        self.retry_delay = Some(seconds);
        self
    }

    pub fn with_cleanup<F>(mut self, cleanup: F) -> Self
    where
        F: FnMut(&mut JobContext<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> JobKind {
        self.hooks.kind()
    }

    pub fn dependencies(&self) -> &[JobId] {
        &self.deps
    }

    pub fn tries(&self) -> Option<u32> {
        self.tries
    }

    pub fn retry_delay(&self) -> Option<f64> {
        self.retry_delay
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("deps", &self.deps)
            .field("tries", &self.tries)
            .field("retry_delay", &self.retry_delay)
            .field("has_cleanup", &self.has_cleanup())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        let standard = JobSpec::standard("a", |_| Ok(()), |_| Ok(()));
        let dummy = JobSpec::dummy("b");
        let run_only = JobSpec::run_only("c", |_| Ok(()));

        assert_eq!(standard.kind(), JobKind::Standard);
        assert_eq!(dummy.kind(), JobKind::DummyOnly);
        assert_eq!(run_only.kind(), JobKind::RunOnly);
    }

    #[test]
    fn check_failure_converts_from_anyhow() {
        fn check() -> CheckResult {
            Err(anyhow::anyhow!("disk full"))?;
            Ok(())
        }

        let err = check().unwrap_err();
        assert!(matches!(err, CheckFailure::Error(_)));
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn builder_records_policy_and_cleanup() {
        let spec = JobSpec::dummy("x")
            .with_tries(5)
            .with_retry_delay(0.25)
            .with_cleanup(|_| Ok(()));

        assert_eq!(spec.tries(), Some(5));
        assert_eq!(spec.retry_delay(), Some(0.25));
        assert!(spec.has_cleanup());
    }
}
