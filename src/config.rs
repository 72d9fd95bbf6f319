// Fri Oct 16 2026 - Alex

use crate::utils::LoggingUtils;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pid: Option<u32>,
    pub default_alloc_size: u64,
    pub include_free: bool,
    pub output: OutputFormat,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pid: None,
            default_alloc_size: 4096,
            include_free: false,
            output: OutputFormat::Table,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_alloc_size(mut self, size: u64) -> Self {
        self.default_alloc_size = size;
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_include_free(mut self, include_free: bool) -> Self {
        self.include_free = include_free;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_alloc_size == 0 {
            return Err(ConfigError::Validation(
                "default_alloc_size must be greater than 0".to_string(),
            ));
        }
        if LoggingUtils::level_from_str(&self.log_level).is_none() {
            return Err(ConfigError::Validation(format!("unknown log_level '{}'", self.log_level)));
        }
        Ok(())
    }
}
