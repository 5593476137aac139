// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::Verbosity;

/// Validated configuration.
///
/// Built from [`RawConfigFile`] through `TryFrom`, which rejects zero try
/// budgets and negative or non-finite delays.
///
/// ```toml
/// [engine]
/// cleanup = true
/// no_act = false
/// default_tries = 3
/// default_retry_delay = 1.0
/// verbosity = "verbose"
///
/// [job.BuildAssets]
/// tries = 5
/// retry_delay = 0.5
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub engine: EngineSection,

    /// Per-job overrides from `[job.<name>]`, keyed by job name.
    pub job: BTreeMap<String, JobOverride>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(engine: EngineSection, job: BTreeMap<String, JobOverride>) -> Self {
        Self { engine, job }
    }
}

/// Configuration exactly as deserialized, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub job: BTreeMap<String, JobOverride>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Run cleanup hooks automatically at the end of `run()`.
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,

    /// Never call action hooks.
    #[serde(default)]
    pub no_act: bool,

    #[serde(default = "default_tries")]
    pub default_tries: u32,

    /// Seconds between a failed attempt and the next one.
    #[serde(default = "default_retry_delay")]
    pub default_retry_delay: f64,

    #[serde(default)]
    pub verbosity: Verbosity,
}

fn default_cleanup() -> bool {
    true
}

fn default_tries() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            cleanup: default_cleanup(),
            no_act: false,
            default_tries: default_tries(),
            default_retry_delay: default_retry_delay(),
            verbosity: Verbosity::default(),
        }
    }
}

/// `[job.<name>]` section. Wins over values set on the `JobSpec`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobOverride {
    pub tries: Option<u32>,
    pub retry_delay: Option<f64>,
}
