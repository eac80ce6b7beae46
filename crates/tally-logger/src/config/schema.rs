use std::time::Duration;

use serde::Deserialize;
use tally_core::error::{Result, TallyError};

use crate::writer::WriterOptions;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    pub version: u32,

    pub logger: LoggerSection,
}

impl TallyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TallyError::UnsupportedVersion(self.version));
        }

        self.logger.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerSection {
    pub path: String,

    #[serde(default)]
    pub linger_ms: u64,

    #[serde(default)]
    pub sync_every_batch: bool,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl LoggerSection {
    /// Section with defaults for everything but the path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            linger_ms: 0,
            sync_every_batch: false,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(TallyError::Config("logger.path must not be empty".into()));
        }
        if self.linger_ms > 60_000 {
            return Err(TallyError::Config(
                "logger.linger_ms must be between 0 and 60000".into(),
            ));
        }
        if !(1..=60_000).contains(&self.retry_backoff_ms) {
            return Err(TallyError::Config(
                "logger.retry_backoff_ms must be between 1 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            linger: Duration::from_millis(self.linger_ms),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

fn default_retry_backoff_ms() -> u64 {
    1000
}
