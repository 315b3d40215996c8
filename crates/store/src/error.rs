use lectern_core::AppError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read session record at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write session record at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode session record: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Read { path, source } | StoreError::Write { path, source } => {
                AppError::persistence(path, source)
            }
            StoreError::Encode(e) => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}
