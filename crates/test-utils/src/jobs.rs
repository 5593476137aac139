//! Job shapes that record every hook call into a [`CallLog`].

use jobdag::job::{CheckFailure, JobContext, JobSpec};

use crate::CallLog;

fn record(log: &CallLog, ctx: &JobContext<'_>) {
    log.record(format!("{}:{}", ctx.phase(), ctx.job_name()));
}

/// Check always passes; the action never runs.
pub fn always_pass(name: &str, log: &CallLog) -> JobSpec {
    let (check_log, run_log) = (log.clone(), log.clone());
    JobSpec::standard(
        name,
        move |ctx| {
            record(&check_log, ctx);
            Ok(())
        },
        move |ctx| {
            record(&run_log, ctx);
            Ok(())
        },
    )
}

/// Check and recheck always fail.
pub fn always_fail(name: &str, log: &CallLog) -> JobSpec {
    let (check_log, run_log) = (log.clone(), log.clone());
    JobSpec::standard(
        name,
        move |ctx| {
            record(&check_log, ctx);
            Err(CheckFailure::not_ready(format!("{} never passes", ctx.job_name())))
        },
        move |ctx| {
            record(&run_log, ctx);
            Ok(())
        },
    )
}

/// Check passes once the action has run `runs` times in total.
///
/// The run count lives in global storage under `"runs:<name>"`, so it
/// survives retries.
pub fn pass_after_runs(name: &str, runs: i64, log: &CallLog) -> JobSpec {
    let (check_log, run_log) = (log.clone(), log.clone());
    let key = format!("runs:{name}");
    let run_key = key.clone();
    JobSpec::standard(
        name,
        move |ctx| {
            record(&check_log, ctx);
            let done = ctx.global().get_i64(&key).unwrap_or(0);
            if done >= runs {
                Ok(())
            } else {
                Err(CheckFailure::not_ready(format!("{done}/{runs} runs")))
            }
        },
        move |ctx| {
            record(&run_log, ctx);
            ctx.global_mut().increment(&run_key, 1);
            Ok(())
        },
    )
}

pub fn run_only_ok(name: &str, log: &CallLog) -> JobSpec {
    let log = log.clone();
    JobSpec::run_only(name, move |ctx| {
        record(&log, ctx);
        Ok(())
    })
}

pub fn run_only_fail(name: &str, log: &CallLog) -> JobSpec {
    let log = log.clone();
    JobSpec::run_only(name, move |ctx| {
        record(&log, ctx);
        anyhow::bail!("{} refused", ctx.job_name())
    })
}

/// Attach a cleanup hook that records `"cleanup:<name>"`.
pub fn with_recorded_cleanup(spec: JobSpec, log: &CallLog) -> JobSpec {
    let log = log.clone();
    spec.with_cleanup(move |ctx| {
        record(&log, ctx);
        Ok(())
    })
}

/// Attach a cleanup hook that records its call and then fails.
pub fn with_failing_cleanup(spec: JobSpec, log: &CallLog) -> JobSpec {
    let log = log.clone();
    spec.with_cleanup(move |ctx| {
        record(&log, ctx);
        anyhow::bail!("cleanup of {} failed", ctx.job_name())
    })
}
