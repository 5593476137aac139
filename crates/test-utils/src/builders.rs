#![allow(dead_code)]

use jobdag::config::{ConfigFile, EngineSection, JobOverride, RawConfigFile};
use jobdag::types::Verbosity;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                engine: EngineSection::default(),
                job: Default::default(),
            },
        }
    }

    pub fn with_default_tries(mut self, tries: u32) -> Self {
        self.config.engine.default_tries = tries;
        self
    }

    pub fn with_default_retry_delay(mut self, seconds: f64) -> Self {
        self.config.engine.default_retry_delay = seconds;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.config.engine.cleanup = cleanup;
        self
    }

    pub fn with_no_act(mut self, no_act: bool) -> Self {
        self.config.engine.no_act = no_act;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.config.engine.verbosity = verbosity;
        self
    }

    pub fn with_job(mut self, name: &str, tries: Option<u32>, retry_delay: Option<f64>) -> Self {
        self.config
            .job
            .insert(name.to_string(), JobOverride { tries, retry_delay });
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
