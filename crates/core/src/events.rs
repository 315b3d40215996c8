//! Typed notifications produced by the session, clock and library

use crate::types::{BookKey, Bookmark, LoopRange, PlaybackStatus};
use std::path::PathBuf;

/// Why the playback position jumped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpCause {
    Seek,
    Chapter,
    Bookmark,
    Stop,
}

/// What the sleep timer does when it runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerActionKind {
    Pause,
    Stop,
    Custom,
}

/// A state transition worth telling the outside world about
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Session
    TrackChanged {
        key: BookKey,
        title: String,
    },
    StatusChanged {
        key: BookKey,
        status: PlaybackStatus,
    },
    PositionTick {
        key: BookKey,
        position: f64,
        duration: Option<f64>,
    },
    PositionJumped {
        key: BookKey,
        position: f64,
        cause: JumpCause,
    },
    SmartResumed {
        key: BookKey,
        from: f64,
        to: f64,
    },
    LoopAnchorSet {
        key: BookKey,
        at: f64,
    },
    LoopEngaged {
        key: BookKey,
        range: LoopRange,
    },
    LoopWrapped {
        key: BookKey,
        range: LoopRange,
    },
    LoopCleared {
        key: BookKey,
    },
    RateChanged {
        key: BookKey,
        rate: f64,
    },
    VolumeChanged {
        key: BookKey,
        volume: u8,
    },
    EqualizerChanged {
        key: BookKey,
        preset: String,
    },
    BookmarkAdded {
        key: BookKey,
        bookmark: Bookmark,
    },
    FileChanged {
        key: BookKey,
        index: usize,
        path: PathBuf,
    },
    Finished {
        key: BookKey,
    },

    // Sleep timer
    TimerStarted {
        duration_secs: f64,
        action: TimerActionKind,
    },
    TimerExpiring {
        remaining_secs: f64,
    },
    TimerExpired {
        action: TimerActionKind,
    },
    TimerCancelled,

    // Failures
    MediaUnavailable {
        key: Option<BookKey>,
        path: PathBuf,
        reason: String,
    },
    PersistenceFailed {
        key: BookKey,
        reason: String,
    },

    // Library
    BookAdded {
        key: BookKey,
        title: String,
    },
    BookUpdated {
        key: BookKey,
    },
    BookRemoved {
        key: BookKey,
    },
    ShelfCreated {
        name: String,
    },
    ShelfRenamed {
        from: String,
        to: String,
    },
    ShelfRemoved {
        name: String,
    },
    ShelfAssigned {
        key: BookKey,
        shelf: String,
    },
    ShelfUnassigned {
        key: BookKey,
        shelf: String,
    },
    PinChanged {
        key: BookKey,
        pinned: bool,
    },
    FinishedChanged {
        key: BookKey,
        finished: bool,
    },
}

impl Event {
    pub fn is_position_tick(&self) -> bool {
        matches!(self, Self::PositionTick { .. })
    }

    /// The book this event concerns, if any
    pub fn book_key(&self) -> Option<&BookKey> {
        match self {
            Self::TrackChanged { key, .. }
            | Self::StatusChanged { key, .. }
            | Self::PositionTick { key, .. }
            | Self::PositionJumped { key, .. }
            | Self::SmartResumed { key, .. }
            | Self::LoopAnchorSet { key, .. }
            | Self::LoopEngaged { key, .. }
            | Self::LoopWrapped { key, .. }
            | Self::LoopCleared { key }
            | Self::RateChanged { key, .. }
            | Self::VolumeChanged { key, .. }
            | Self::EqualizerChanged { key, .. }
            | Self::BookmarkAdded { key, .. }
            | Self::FileChanged { key, .. }
            | Self::Finished { key }
            | Self::PersistenceFailed { key, .. }
            | Self::BookAdded { key, .. }
            | Self::BookUpdated { key }
            | Self::BookRemoved { key }
            | Self::ShelfAssigned { key, .. }
            | Self::ShelfUnassigned { key, .. }
            | Self::PinChanged { key, .. }
            | Self::FinishedChanged { key, .. } => Some(key),
            Self::MediaUnavailable { key, .. } => key.as_ref(),
            Self::TimerStarted { .. }
            | Self::TimerExpiring { .. }
            | Self::TimerExpired { .. }
            | Self::TimerCancelled
            | Self::ShelfCreated { .. }
            | Self::ShelfRenamed { .. }
            | Self::ShelfRemoved { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_key_lookup() {
        let key = BookKey::from_string("abc");
        let tick = Event::PositionTick {
            key: key.clone(),
            position: 1.0,
            duration: None,
        };
        assert!(tick.is_position_tick());
        assert_eq!(tick.book_key(), Some(&key));

        assert_eq!(Event::TimerCancelled.book_key(), None);
        let missing = Event::MediaUnavailable {
            key: None,
            path: PathBuf::from("/x.mp3"),
            reason: "gone".to_string(),
        };
        assert_eq!(missing.book_key(), None);
    }
}
