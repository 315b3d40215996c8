use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Loading, saving or locating `config.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A config file with nothing but whitespace in it
    #[error("{path} is empty")]
    Empty { path: PathBuf },

    #[error("{path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot encode settings: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Refused to save; every offending field is listed
    #[error("Invalid settings: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    /// Covers the temp file, the flush and the final rename
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot copy the previous config to {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The platform has no home or config directory for this user
    #[error("No config location: {0}")]
    NoLocation(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ValidationError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One rejected setting, addressed by its dotted TOML path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Same, quoting the rejected value in the message
    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::new(field, message)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} (found {})", self.field, self.message, value),
            None => write!(f, "{} {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_names_the_field() {
        let err = ValidationError::new("player.tick_interval_ms", "must be between 50 and 5000");
        assert_eq!(
            err.to_string(),
            "player.tick_interval_ms must be between 50 and 5000"
        );

        let err = ValidationError::with_value("player.default_volume", "must be at most 100", 150);
        assert_eq!(
            err.to_string(),
            "player.default_volume must be at most 100 (found 150)"
        );
    }

    #[test]
    fn test_invalid_lists_every_field() {
        let err = ConfigError::Invalid(vec![
            ValidationError::new("app.log_level", "is unknown"),
            ValidationError::with_value("player.default_rate", "is out of range", 9),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid settings: app.log_level is unknown; player.default_rate is out of range (found 9)"
        );
    }
}
