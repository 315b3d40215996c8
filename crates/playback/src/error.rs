use lectern_core::{AppError, BookKey, PlaybackStatus};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Transport failed: {0}")]
    Failed(String),

    #[error("Transport did not answer within {0:?}")]
    TimedOut(Duration),

    #[error("Transport thread is gone")]
    Disconnected,
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("A book is already open (status {0})")]
    Busy(PlaybackStatus),

    #[error("No book is open")]
    NotLoaded,

    #[error("Book {0} has no media files")]
    EmptyBook(BookKey),

    #[error("Media unavailable at {path}: {reason}")]
    MediaUnavailable { path: PathBuf, reason: String },

    #[error("No bookmark at index {0}")]
    NoSuchBookmark(usize),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::MediaUnavailable { path, reason } => {
                AppError::MediaUnavailable { path, reason }
            }
            SessionError::EmptyBook(key) => AppError::InvalidArgument {
                argument: "book".to_string(),
                reason: format!("{} has no media files", key),
            },
            SessionError::NoSuchBookmark(index) => AppError::NotFound {
                entity: "bookmark".to_string(),
                identifier: index.to_string(),
            },
            SessionError::Busy(_) | SessionError::NotLoaded => {
                AppError::InvalidState(err.to_string())
            }
            SessionError::Transport(e) => AppError::MediaUnavailable {
                path: PathBuf::new(),
                reason: e.to_string(),
            },
        }
    }
}
