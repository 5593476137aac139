// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{JobdagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = JobdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.engine, raw.job))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_tries("[engine].default_tries", cfg.engine.default_tries)?;
    retry_delay_from_secs("[engine].default_retry_delay", cfg.engine.default_retry_delay)?;

    for (name, over) in &cfg.job {
        if name.trim().is_empty() {
            return Err(JobdagError::ConfigError(
                "[job.<name>] sections need a non-empty job name".to_string(),
            ));
        }
        if let Some(tries) = over.tries {
            validate_tries(name, tries)?;
        }
        if let Some(delay) = over.retry_delay {
            retry_delay_from_secs(name, delay)?;
        }
    }

    Ok(())
}

/// A try budget must allow at least one attempt.
pub(crate) fn validate_tries(job: &str, tries: u32) -> Result<u32> {
    if tries == 0 {
        return Err(JobdagError::InvalidTries {
            job: job.to_string(),
            tries,
        });
    }
    Ok(tries)
}

/// Convert a delay in seconds, rejecting negative, NaN and infinite values.
pub(crate) fn retry_delay_from_secs(job: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| JobdagError::InvalidRetryDelay {
        job: job.to_string(),
        delay: secs,
    })
}
