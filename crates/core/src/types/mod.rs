//! Domain types for Lectern
//!
//! - `book`: books, media files, chapters and keys
//! - `bookmark`: bookmarks and A-B loop ranges
//! - `session`: per-book persisted session state
//! - `shelf`: user shelves and virtual views
//! - `status`: playback lifecycle states
//! - `timeline`: global timeline across a book's files
//! - `common`: timestamps, time formatting and validation

mod book;
mod bookmark;
mod common;
mod session;
mod shelf;
mod status;
mod timeline;

pub use book::{Book, BookKey, BookKind, BookLocator, Chapter, MediaFile};
pub use bookmark::{insert_sorted, Bookmark, LoopRange};
pub use common::{format_clock, format_spoken, Timestamp, Validator};
pub use session::{clamp_rate, SessionState, DEFAULT_EQUALIZER, MAX_RATE, MAX_VOLUME, MIN_RATE};
pub use shelf::Shelf;
pub use status::PlaybackStatus;
pub use timeline::Timeline;
