//! Runtime configuration.
//!
//! Sources, lowest precedence first: defaults, a JSON file, then the
//! `TBIND_DISPLAY_OFFSET` / `TBIND_LOG` environment variables.

use crate::error::{TbError, TbResult};
use crate::time;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const ENV_DISPLAY_OFFSET: &str = "TBIND_DISPLAY_OFFSET";
pub const ENV_LOG: &str = "TBIND_LOG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TbConfig {
    /// Default display timezone for time columns, as a UTC offset (`+09:00`).
    /// Local time is used when unset.
    pub display_offset: Option<String>,

    /// Default `tracing` filter (`info`, `tbind_core=debug`, ...).
    pub log_level: Option<String>,
}

impl TbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display_offset(mut self, offset: impl Into<String>) -> Self {
        self.display_offset = Some(offset.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Read a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> TbResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TbError::Config(format!("{}: {e}", path.display())))?;
        let config: TbConfig = serde_json::from_str(&text)
            .map_err(|e| TbError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the environment.
    pub fn from_env() -> TbResult<Self> {
        Self::new().merge_env()
    }

    /// Override fields with environment variables that are set.
    pub fn merge_env(mut self) -> TbResult<Self> {
        if let Ok(offset) = env::var(ENV_DISPLAY_OFFSET) {
            self.display_offset = Some(offset);
        }
        if let Ok(level) = env::var(ENV_LOG) {
            self.log_level = Some(level);
        }
        self.validate()?;
        Ok(self)
    }

    /// Parsed display offset, `None` meaning local time.
    pub fn display_offset(&self) -> TbResult<Option<FixedOffset>> {
        self.display_offset
            .as_deref()
            .map(time::parse_offset)
            .transpose()
    }

    pub fn validate(&self) -> TbResult<()> {
        self.display_offset().map(|_| ())
    }
}
