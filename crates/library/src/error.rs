use lectern_core::{AppError, BookKey};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Book not found: {0}")]
    BookNotFound(BookKey),

    #[error("Book is not pinned: {0}")]
    NotPinned(BookKey),

    #[error("Shelf not found: {0}")]
    ShelfNotFound(String),

    #[error("Shelf already exists: {0}")]
    ShelfExists(String),

    #[error("'{0}' is a virtual shelf and cannot be modified")]
    VirtualShelf(String),

    #[error("Invalid shelf name: {0:?}")]
    InvalidShelfName(String),

    #[error("Metadata extraction failed for {path}: {reason}")]
    MetadataError { path: PathBuf, reason: String },

    #[error("Failed to write catalog at {path}: {source}")]
    CatalogWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode catalog: {0}")]
    CatalogEncode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LibraryResult<T> = std::result::Result<T, LibraryError>;

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::BookNotFound(key) => AppError::book_not_found(key),
            LibraryError::NotPinned(key) => AppError::InvalidArgument {
                argument: "book".to_string(),
                reason: format!("{} is not pinned", key),
            },
            LibraryError::ShelfNotFound(name) => AppError::NotFound {
                entity: "shelf".to_string(),
                identifier: name,
            },
            LibraryError::ShelfExists(name)
            | LibraryError::VirtualShelf(name)
            | LibraryError::InvalidShelfName(name) => AppError::InvalidArgument {
                argument: "shelf".to_string(),
                reason: name,
            },
            LibraryError::MetadataError { path, reason } => {
                AppError::MediaUnavailable { path, reason }
            }
            LibraryError::CatalogWrite { path, source } => AppError::persistence(path, source),
            other => AppError::Internal {
                message: other.to_string(),
            },
        }
    }
}
