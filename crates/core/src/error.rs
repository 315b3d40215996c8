//! Error taxonomy and recovery strategies for Lectern
//!
//! Every failure in the player core falls into one of three severity tiers:
//! - **Recoverable**: retried automatically on the next clock tick (sidecar write failed)
//! - **Degraded**: the feature is unavailable but the player keeps running (missing media)
//! - **Fatal**: unrecoverable resource exhaustion (disk full on every retry)
//!
//! Out-of-range inputs (seek past the end, rate outside bounds) are not errors at all:
//! they are clamped at the API boundary.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Keep the state dirty and retry on the next debounce tick
    RetryNextTick,
    /// Continue with default values (missing or unreadable records)
    UseDefaults,
    /// Leave the player idle and tell the user the media is unavailable
    ReportToUser,
    /// Flush what can be flushed and shut down
    SafeShutdown,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryNextTick => write!(f, "Retrying on next tick"),
            Self::UseDefaults => write!(f, "Using defaults"),
            Self::ReportToUser => write!(f, "Reporting to user"),
            Self::SafeShutdown => write!(f, "Performing safe shutdown"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Feature degraded but the player continues
    Degraded,
    /// Critical error requiring shutdown or user action
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type shared by the Lectern crates
#[derive(Error, Debug)]
pub enum AppError {
    /// Media file missing, corrupt, or the transport refused to bind
    #[error("Media unavailable: {path}: {reason}")]
    MediaUnavailable { path: PathBuf, reason: String },

    /// Sidecar or catalog write failed
    #[error("Persistence error at {path}: {source}")]
    PersistenceError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A persisted record could not be parsed
    #[error("Corrupt record at {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    /// Storage medium is full
    #[error("Disk full while writing {path}")]
    DiskFull { path: PathBuf },

    /// Entity not present in the library
    #[error("Not found: {entity} {identifier}")]
    NotFound { entity: String, identifier: String },

    /// Operation not permitted on this target (e.g. assigning to a virtual shelf)
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// Operation is not legal in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::PersistenceError { .. } => ErrorSeverity::Recoverable,
            Self::DiskFull { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Degraded,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::PersistenceError { .. } => RecoveryAction::RetryNextTick,
            Self::CorruptRecord { .. } => RecoveryAction::UseDefaults,
            Self::DiskFull { .. } => RecoveryAction::SafeShutdown,
            _ => RecoveryAction::ReportToUser,
        }
    }

    /// Returns a user-facing message suitable for announcement
    pub fn user_message(&self) -> String {
        match self {
            Self::MediaUnavailable { .. } => {
                "This book's audio files cannot be opened. They may have been moved or deleted."
                    .to_string()
            }
            Self::PersistenceError { .. } => {
                "Listening progress could not be saved. It will be retried.".to_string()
            }
            Self::CorruptRecord { .. } => {
                "Saved progress for this book was unreadable. Starting from the beginning."
                    .to_string()
            }
            Self::DiskFull { .. } => {
                "Not enough storage space to save listening progress.".to_string()
            }
            Self::NotFound { entity, .. } => format!("The requested {} was not found.", entity),
            Self::InvalidArgument { .. } => "That action is not allowed here.".to_string(),
            Self::InvalidState(_) => "That action is not available right now.".to_string(),
            Self::Internal { .. } => "An unexpected error occurred.".to_string(),
        }
    }

    /// Returns true if this error should be logged at ERROR level
    pub fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if this error is retried automatically
    pub fn is_retryable(&self) -> bool {
        self.recovery_action() == RecoveryAction::RetryNextTick
    }

    /// Builds a persistence error, promoting out-of-space conditions to `DiskFull`
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::StorageFull {
            Self::DiskFull { path }
        } else {
            Self::PersistenceError { path, source }
        }
    }

    /// Helper for `NotFound` on a book key
    pub fn book_not_found(key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: "book".to_string(),
            identifier: key.to_string(),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Recoverable < ErrorSeverity::Degraded);
        assert!(ErrorSeverity::Degraded < ErrorSeverity::Fatal);
    }

    #[test]
    fn test_persistence_error_is_retryable() {
        let err = AppError::persistence(
            "/books/a/.lectern-session.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        );
        assert_eq!(err.severity(), ErrorSeverity::Recoverable);
        assert!(err.is_retryable());
        assert!(!err.is_critical());
    }

    #[test]
    fn test_storage_full_becomes_disk_full() {
        let err = AppError::persistence(
            "/books/a/.lectern-session.json",
            io::Error::new(io::ErrorKind::StorageFull, "no space"),
        );
        assert!(matches!(err, AppError::DiskFull { .. }));
        assert!(err.is_critical());
        assert_eq!(err.recovery_action(), RecoveryAction::SafeShutdown);
    }

    #[test]
    fn test_corrupt_record_uses_defaults() {
        let err = AppError::CorruptRecord {
            path: PathBuf::from("x"),
            reason: "EOF".to_string(),
        };
        assert_eq!(err.recovery_action(), RecoveryAction::UseDefaults);
        assert_eq!(err.severity(), ErrorSeverity::Degraded);
    }

    #[test]
    fn test_media_unavailable_is_degraded() {
        let err = AppError::MediaUnavailable {
            path: PathBuf::from("/missing.m4b"),
            reason: "not found".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Degraded);
        assert_eq!(err.recovery_action(), RecoveryAction::ReportToUser);
        assert!(err.to_string().contains("/missing.m4b"));
    }

    #[test]
    fn test_user_messages_are_friendly() {
        let errors = vec![
            AppError::book_not_found("abc"),
            AppError::InvalidState("idle".to_string()),
            AppError::Internal {
                message: "boom".to_string(),
            },
        ];
        for err in errors {
            let msg = err.user_message();
            assert!(!msg.is_empty());
            assert!(!msg.contains("boom"));
        }
    }

    #[test]
    fn test_recovery_action_display() {
        assert_eq!(
            RecoveryAction::RetryNextTick.to_string(),
            "Retrying on next tick"
        );
    }
}
