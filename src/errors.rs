// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in job graph: {0}")]
    DagCycle(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job '{0}' cannot depend on itself")]
    SelfDependency(String),

    #[error("Duplicate job name: {0}")]
    DuplicateJob(String),

    #[error("Job '{job}' has invalid tries {tries} (must be >= 1)")]
    InvalidTries { job: String, tries: u32 },

    #[error("Job '{job}' has invalid retry delay {delay}s (must be finite and >= 0)")]
    InvalidRetryDelay { job: String, delay: f64 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobdagError {
    /// True for the errors raised while validating a job graph or its
    /// configuration, before any job runs.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, JobdagError::IoError(_) | JobdagError::Other(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, JobdagError>;
