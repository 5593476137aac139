// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::engine::EngineOptions;
use crate::types::Verbosity;

/// Command-line arguments for `jobdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobdag",
    version,
    about = "Run a dependency-ordered graph of check/run jobs with retries.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Jobdag.toml` is used when it exists, built-in defaults
    /// otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run checks only; never call action hooks.
    #[arg(short = 'n', long)]
    pub no_act: bool,

    /// Report every check / run / recheck.
    #[arg(short, long)]
    pub verbose: bool,

    /// Like `--verbose`, plus the full error chain of each failure.
    #[arg(short, long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Leave cleanup hooks uncalled at the end of the run.
    #[arg(long)]
    pub no_cleanup: bool,

    /// Write the final job graph in Graphviz DOT form to this file.
    #[arg(long, value_name = "PATH")]
    pub dot: Option<PathBuf>,

    /// Deployment target of the release pipeline.
    #[arg(long, default_value = "staging")]
    pub target: String,

    /// State of the deploy token (`valid`, `expired`, ...).
    #[arg(long, default_value = "valid")]
    pub token_state: String,

    /// Pretend another release holds the deploy lock.
    #[arg(long)]
    pub lock_held: bool,

    /// Build attempt that first produces assets.
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub build_success_try: i64,

    /// Subscriber to notify once the release is out (repeatable).
    #[arg(long = "notify", value_name = "NAME", default_values = ["ops", "docs"])]
    pub subscribers: Vec<String>,
}

impl CliArgs {
    /// Apply the flags that override configuration values.
    pub fn apply_to(&self, options: &mut EngineOptions) {
        if self.no_act {
            options.no_act = true;
        }
        if self.no_cleanup {
            options.cleanup = false;
        }
        if self.debug {
            options.verbosity = Verbosity::Debug;
        } else if self.verbose {
            options.verbosity = Verbosity::Verbose;
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
