use lectern_core::{AppError, BookKey};
use lectern_library::LibraryError;
use lectern_playback::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("Book not in library: {0}")]
    BookNotFound(BookKey),

    #[error("Player task is no longer running")]
    Stopped,
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;

impl From<PlayerError> for AppError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::Session(e) => e.into(),
            PlayerError::Library(e) => e.into(),
            PlayerError::BookNotFound(key) => AppError::book_not_found(key.as_str()),
            PlayerError::Stopped => AppError::InvalidState(err.to_string()),
        }
    }
}
