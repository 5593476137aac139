// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod dag;
pub mod demo;
pub mod engine;
pub mod errors;
pub mod job;
pub mod logging;
pub mod storage;
pub mod types;

use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::ConfigFile;
use crate::dag::NodeStatus;
use crate::demo::DemoInputs;

pub use crate::engine::{CleanupReport, Engine, EngineOptions, RunSummary};
pub use crate::job::{CheckFailure, CheckResult, JobCatalog, JobContext, JobId, JobSpec};
pub use crate::storage::Arguments;

/// High-level entry point used by `main.rs`.
///
/// Loads configuration, runs the bundled release pipeline and prints a
/// per-job summary. Returns whether the root job succeeded.
pub fn run(args: CliArgs) -> Result<bool> {
    let cfg = load_config(&args)?;
    let mut options = EngineOptions::from_config(&cfg);
    args.apply_to(&mut options);

    let (catalog, root) = demo::release_pipeline(&args.subscribers)?;
    let mut engine = Engine::configure(catalog, root, options)?;

    let inputs = DemoInputs {
        target: args.target.clone(),
        token_state: args.token_state.clone(),
        lock_free: !args.lock_held,
        build_success_try: args.build_success_try,
        ..DemoInputs::default()
    };
    engine.set_arguments(inputs.arguments())?;

    let summary = engine.run()?;

    if let Some(path) = &args.dot {
        fs::write(path, engine.graph().to_dot())
            .with_context(|| format!("writing DOT graph to {}", path.display()))?;
        info!(path = %path.display(), "wrote job graph");
    }

    print_summary(&engine, &summary);
    Ok(summary.succeeded)
}

/// `--config` if given, else `Jobdag.toml` if present, else defaults.
fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let fallback = default_config_path();
            if !fallback.exists() {
                debug!("no config file; using defaults");
                return Ok(ConfigFile::default());
            }
            fallback
        }
    };

    let cfg = load_and_validate(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    debug!(path = %path.display(), jobs = cfg.job.len(), "config loaded");
    Ok(cfg)
}

fn print_summary(engine: &Engine, summary: &RunSummary) {
    println!("jobdag: {} rounds", summary.rounds);
    for node in engine.graph().nodes() {
        match node.last_error() {
            Some(err) if node.status() != NodeStatus::Success => {
                println!("  {:<22} {:<14} {} ({err})", node.name(), node.status(), node.attempts());
            }
            _ => println!("  {:<22} {:<14} {}", node.name(), node.status(), node.attempts()),
        }
    }

    if let Some(report) = &summary.cleanup {
        for failure in &report.failures {
            println!("  cleanup of {} failed: {:#}", failure.job, failure.error);
        }
    }

    let verdict = if summary.succeeded {
        "succeeded"
    } else if engine.partial_success() {
        "partially succeeded"
    } else {
        "failed"
    };
    println!("{}: {verdict}", engine.graph().root().name());
}
