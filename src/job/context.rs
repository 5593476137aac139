// src/job/context.rs

use std::fmt;
use std::time::Instant;

use crate::clock::Clock;
use crate::storage::{Arguments, Storage};

/// Which hook invocation is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// First call of the check hook in an attempt cycle.
    Check,
    /// The action hook.
    Run,
    /// Second call of the check hook, after the action hook.
    Recheck,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Check => "check",
            Phase::Run => "run",
            Phase::Recheck => "recheck",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

/// Everything a hook may touch while it runs.
pub struct JobContext<'a> {
    job: &'a str,
    phase: Phase,
    attempt: u32,
    args: &'a Arguments,
    global: &'a mut Storage,
    local: &'a mut Storage,
    clock: &'a dyn Clock,
}

impl<'a> JobContext<'a> {
    pub(crate) fn new(
        job: &'a str,
        phase: Phase,
        attempt: u32,
        args: &'a Arguments,
        global: &'a mut Storage,
        local: &'a mut Storage,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            job,
            phase,
            attempt,
            args,
            global,
            local,
            clock,
        }
    }

    pub fn job_name(&self) -> &str {
        self.job
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_recheck(&self) -> bool {
        self.phase == Phase::Recheck
    }

    /// 1-based number of the attempt cycle in progress.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn args(&self) -> &Arguments {
        self.args
    }

    /// Store shared by every job for the whole execution.
    pub fn global(&self) -> &Storage {
        &*self.global
    }

    pub fn global_mut(&mut self) -> &mut Storage {
        &mut *self.global
    }

    /// Store private to this job and this attempt cycle.
    pub fn local(&self) -> &Storage {
        &*self.local
    }

    pub fn local_mut(&mut self) -> &mut Storage {
        &mut *self.local
    }

    /// Current time according to the engine's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl fmt::Debug for JobContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("job", &self.job)
            .field("phase", &self.phase)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}
