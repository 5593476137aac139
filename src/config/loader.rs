// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// range checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Jobdag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Jobdag.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verbosity;

    #[test]
    fn parses_engine_and_job_sections() {
        let raw = load_from_str(
            r#"
            [engine]
            cleanup = false
            default_tries = 4
            verbosity = "debug"

            [job.BuildAssets]
            tries = 5
            retry_delay = 0.5
            "#,
        )
        .unwrap();

        assert!(!raw.engine.cleanup);
        assert!(!raw.engine.no_act);
        assert_eq!(raw.engine.default_tries, 4);
        assert_eq!(raw.engine.default_retry_delay, 1.0);
        assert_eq!(raw.engine.verbosity, Verbosity::Debug);
        assert_eq!(raw.job["BuildAssets"].tries, Some(5));
        assert_eq!(raw.job["BuildAssets"].retry_delay, Some(0.5));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let raw = load_from_str("").unwrap();
        assert!(raw.engine.cleanup);
        assert!(raw.job.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(load_from_str("[engine]\nretries = 2\n").is_err());
    }
}
