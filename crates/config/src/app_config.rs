//! Application-level configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Default log filter, overridden by RUST_LOG
    pub log_level: LogLevel,

    /// Explicit data directory (library catalog). Takes precedence over
    /// portable mode and the platform default.
    pub data_dir: Option<PathBuf>,

    /// Number of books listed by `history`
    pub history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            data_dir: None,
            history_limit: 20,
        }
    }
}

impl ConfigSection for AppConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                results.push(Err(ValidationError::new(
                    "app.data_dir",
                    "must not be empty when set",
                )));
            }
        }

        results.push(Validator::in_range(
            self.history_limit,
            1,
            500,
            "app.history_limit",
        ));

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.log_level = other.log_level;
        self.data_dir = other.data_dir;
        self.history_limit = other.history_limit;
    }

    fn section_name(&self) -> &'static str {
        "app"
    }
}
