//! Core domain model for Lectern: books, per-book session state, shelves,
//! the event vocabulary and the shared error taxonomy.

pub mod error;
pub mod events;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, RecoveryAction, Result};
pub use events::{Event, JumpCause, TimerActionKind};
pub use types::{
    clamp_rate, format_clock, format_spoken, insert_sorted, Book, BookKey, BookKind, BookLocator,
    Bookmark, Chapter, LoopRange, MediaFile, PlaybackStatus, SessionState, Shelf, Timeline,
    Timestamp, Validator, DEFAULT_EQUALIZER, MAX_RATE, MAX_VOLUME, MIN_RATE,
};
