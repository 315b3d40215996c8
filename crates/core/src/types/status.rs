//! Playback session lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// No book bound
    #[default]
    Idle,
    /// Transport is binding to the book's media
    Loading,
    Playing,
    Paused,
    /// A seek is being applied; returns to the state it came from
    Seeking,
    Stopped,
    /// The last file of the book played to its end
    Ended,
}

impl PlaybackStatus {
    /// True once a book is bound to the transport
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::Idle | Self::Loading)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Seeking => "Seeking",
            Self::Stopped => "Stopped",
            Self::Ended => "Ended",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loaded_states() {
        assert!(!PlaybackStatus::Idle.is_loaded());
        assert!(!PlaybackStatus::Loading.is_loaded());
        assert!(PlaybackStatus::Paused.is_loaded());
        assert!(PlaybackStatus::Ended.is_loaded());
        assert_eq!(PlaybackStatus::default(), PlaybackStatus::Idle);
    }
}
