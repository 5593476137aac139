// src/engine/attempt.rs

//! One attempt cycle of one node.
//!
//! - Standard: check; on failure run, then recheck. Only the checks decide
//!   the outcome; whatever the action hook returns is logged and dropped.
//! - DummyOnly: succeeds without calling anything.
//! - RunOnly: run; `Ok` is success.
//!
//! In no-act mode action hooks are never called, so a failed check (or any
//! run-only job) fails the attempt.
//!
//! Retry accounting happens afterwards, in
//! [`StateManager::record_outcome`](crate::dag::state_manager::StateManager::record_outcome).

use std::fmt::Display;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::dag::graph::GraphNode;
use crate::dag::NodeStatus;
use crate::engine::AttemptOutcome;
use crate::job::spec::Hooks;
use crate::job::{JobContext, Phase};
use crate::storage::{Arguments, StorageManager};
use crate::types::Verbosity;

/// What an attempt cycle may touch besides the node itself.
pub(crate) struct AttemptEnv<'a> {
    pub args: &'a Arguments,
    pub storage: &'a mut StorageManager,
    pub clock: &'a dyn Clock,
    pub no_act: bool,
    pub verbosity: Verbosity,
}

pub(crate) fn run_attempt_cycle(node: &mut GraphNode, env: &mut AttemptEnv<'_>) -> AttemptOutcome {
    let attempt = node.attempts + 1;
    node.local = env.storage.fresh_local();

    let GraphNode {
        spec,
        status,
        local,
        passed_initial_check,
        acted,
        ..
    } = node;
    let name = spec.name.as_str();
    let verbosity = env.verbosity;

    match &mut spec.hooks {
        Hooks::DummyOnly => {
            report_pass(verbosity, name, Phase::Check, attempt);
            AttemptOutcome::Succeeded { acted: false }
        }

        Hooks::Standard { check, run } => {
            *status = NodeStatus::Checking;
            let first = {
                let mut ctx = JobContext::new(
                    name, Phase::Check, attempt, env.args, env.storage.global_mut(), local, env.clock,
                );
                check(&mut ctx)
            };

            let check_err = match first {
                Ok(()) => {
                    report_pass(verbosity, name, Phase::Check, attempt);
                    *passed_initial_check = true;
                    return AttemptOutcome::Succeeded { acted: false };
                }
                Err(err) => err,
            };
            report_fail(verbosity, name, Phase::Check, attempt, &check_err);
            *status = NodeStatus::NeedsAction;

            if env.no_act {
                debug!(job = name, attempt, "no-act mode: not running action");
                return AttemptOutcome::Failed {
                    acted: false,
                    error: check_err.to_string(),
                };
            }

            *status = NodeStatus::Running;
            *acted = true;
            let action = {
                let mut ctx = JobContext::new(
                    name, Phase::Run, attempt, env.args, env.storage.global_mut(), local, env.clock,
                );
                run(&mut ctx)
            };
            match action {
                Ok(()) => report_pass(verbosity, name, Phase::Run, attempt),
                Err(err) => report_fail(verbosity, name, Phase::Run, attempt, &err),
            }

            *status = NodeStatus::Rechecking;
            let second = {
                let mut ctx = JobContext::new(
                    name, Phase::Recheck, attempt, env.args, env.storage.global_mut(), local, env.clock,
                );
                check(&mut ctx)
            };
            match second {
                Ok(()) => {
                    report_pass(verbosity, name, Phase::Recheck, attempt);
                    AttemptOutcome::Succeeded { acted: true }
                }
                Err(err) => {
                    report_fail(verbosity, name, Phase::Recheck, attempt, &err);
                    AttemptOutcome::Failed {
                        acted: true,
                        error: err.to_string(),
                    }
                }
            }
        }

        Hooks::RunOnly { run } => {
            if env.no_act {
                debug!(job = name, attempt, "no-act mode: run-only job cannot succeed");
                return AttemptOutcome::Failed {
                    acted: false,
                    error: "run-only job not run in no-act mode".to_string(),
                };
            }

            *status = NodeStatus::Running;
            *acted = true;
            let action = {
                let mut ctx = JobContext::new(
                    name, Phase::Run, attempt, env.args, env.storage.global_mut(), local, env.clock,
                );
                run(&mut ctx)
            };
            match action {
                Ok(()) => {
                    report_pass(verbosity, name, Phase::Run, attempt);
                    AttemptOutcome::Succeeded { acted: true }
                }
                Err(err) => {
                    report_fail(verbosity, name, Phase::Run, attempt, &err);
                    AttemptOutcome::Failed {
                        acted: true,
                        error: err.to_string(),
                    }
                }
            }
        }
    }
}

fn report_pass(verbosity: Verbosity, job: &str, phase: Phase, attempt: u32) {
    if verbosity >= Verbosity::Verbose {
        info!(job, %phase, attempt, "{job}.{phase}: pass");
    } else {
        debug!(job, %phase, attempt, "{job}.{phase}: pass");
    }
}

fn report_fail<E>(verbosity: Verbosity, job: &str, phase: Phase, attempt: u32, err: &E)
where
    E: Display + ?Sized,
{
    match verbosity {
        Verbosity::Debug => info!(job, %phase, attempt, error = %format!("{err:#}"), "{job}.{phase}: fail"),
        Verbosity::Verbose => info!(job, %phase, attempt, error = %err, "{job}.{phase}: fail"),
        Verbosity::Quiet => debug!(job, %phase, attempt, error = %err, "{job}.{phase}: fail"),
    }
}
