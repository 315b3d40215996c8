//! Lectern player
//!
//! Runs a playback session as a tokio task. A [`Player`] owns the session,
//! its clock, the library and the state store; a [`PlayerHandle`] talks to
//! it from anywhere. Closing a book or shutting down flushes the session
//! with a bounded wait and reports anything that could not be written.

pub mod command;
pub mod error;
pub mod handle;
pub mod player;
mod writer;

pub use command::{CloseReport, PlayerSnapshot};
pub use error::{PlayerError, PlayerResult};
pub use handle::PlayerHandle;
pub use player::Player;
