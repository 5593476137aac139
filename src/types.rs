use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How much the engine reports about each job phase.
///
/// - `Quiet`: phase outcomes are only emitted at `debug` level.
/// - `Verbose`: one `info` line per check / run / recheck.
/// - `Debug`: like `Verbose`, plus the full error chain of every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Quiet,
    Verbose,
    Debug,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Quiet
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quiet" => Ok(Verbosity::Quiet),
            "verbose" => Ok(Verbosity::Verbose),
            "debug" => Ok(Verbosity::Debug),
            other => Err(format!(
                "invalid verbosity: {other} (expected \"quiet\", \"verbose\" or \"debug\")"
            )),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Verbose => "verbose",
            Verbosity::Debug => "debug",
        };
        f.write_str(s)
    }
}
