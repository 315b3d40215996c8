//! Spoken feedback for screen reader users
//!
//! The announcer turns dispatched events into short sentences and hands them
//! to an [`AccessibilityChannel`]. It never looks at the session directly.

use crate::dispatcher::Subscriber;
use lectern_config::{AccessibilityConfig, Verbosity};
use lectern_core::{format_clock, format_spoken, Event, JumpCause, PlaybackStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where announcements are spoken: a screen reader, a braille display, a log
pub trait AccessibilityChannel: Send {
    fn announce(&mut self, text: &str);
}

/// How important a message is, compared against the configured verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Importance {
    Critical,
    Minimal,
    Full,
}

impl Importance {
    pub fn allowed_at(self, verbosity: Verbosity) -> bool {
        match verbosity {
            Verbosity::Full => true,
            Verbosity::Minimal => self <= Importance::Minimal,
            Verbosity::Silent => self == Importance::Critical,
        }
    }
}

/// Shared flag telling the announcer whether the app window has focus
#[derive(Debug, Clone)]
pub struct FocusHandle(Arc<AtomicBool>);

impl FocusHandle {
    pub fn new(focused: bool) -> Self {
        Self(Arc::new(AtomicBool::new(focused)))
    }

    pub fn set_focused(&self, focused: bool) {
        self.0.store(focused, Ordering::Relaxed);
    }

    pub fn is_focused(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for FocusHandle {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Text and importance for an event, or `None` for events nobody hears
pub fn describe(event: &Event) -> Option<(String, Importance)> {
    use Importance::*;

    let message = match event {
        Event::TrackChanged { title, .. } => (format!("Now playing {}", title), Minimal),
        Event::StatusChanged { status, .. } => match status {
            PlaybackStatus::Playing => ("Playing".to_string(), Full),
            PlaybackStatus::Paused => ("Paused".to_string(), Full),
            PlaybackStatus::Stopped => ("Stopped".to_string(), Minimal),
            _ => return None,
        },
        Event::PositionJumped {
            position, cause, ..
        } => match cause {
            JumpCause::Stop => return None,
            _ => (format!("Jumped to {}", format_clock(*position)), Full),
        },
        Event::SmartResumed { from, to, .. } => (
            format!("Smart resume: {} back", format_spoken(from - to)),
            Minimal,
        ),
        Event::LoopAnchorSet { at, .. } => {
            (format!("Loop start at {}", format_clock(*at)), Full)
        }
        Event::LoopEngaged { range, .. } => (
            format!(
                "Looping from {} to {}",
                format_clock(range.a()),
                format_clock(range.b())
            ),
            Minimal,
        ),
        Event::LoopCleared { .. } => ("Loop cleared".to_string(), Minimal),
        Event::RateChanged { rate, .. } => (format!("Speed {}x", rate), Full),
        Event::VolumeChanged { volume, .. } => (format!("Volume {} percent", volume), Full),
        Event::EqualizerChanged { preset, .. } => (format!("Equalizer {}", preset), Full),
        Event::BookmarkAdded { bookmark, .. } => (
            format!("Bookmark added at {}", format_clock(bookmark.offset)),
            Minimal,
        ),
        Event::Finished { .. } => ("End of book".to_string(), Minimal),
        Event::TimerStarted { duration_secs, .. } => (
            format!("Sleep timer set for {}", format_spoken(*duration_secs)),
            Minimal,
        ),
        Event::TimerExpiring { remaining_secs } => (
            format!("{} remaining", format_spoken(remaining_secs.round())),
            Minimal,
        ),
        Event::TimerExpired { .. } => ("Sleep timer finished".to_string(), Minimal),
        Event::TimerCancelled => ("Sleep timer cancelled".to_string(), Minimal),
        Event::MediaUnavailable { path, .. } => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            (format!("Cannot play {}", name), Critical)
        }
        Event::PersistenceFailed { .. } => {
            ("Could not save your position".to_string(), Critical)
        }
        Event::BookRemoved { .. } => ("Book removed".to_string(), Full),
        Event::ShelfCreated { name } => (format!("Shelf {} created", name), Full),
        Event::ShelfRenamed { to, .. } => (format!("Shelf renamed to {}", to), Full),
        Event::ShelfRemoved { name } => (format!("Shelf {} removed", name), Full),
        Event::ShelfAssigned { shelf, .. } => (format!("Added to {}", shelf), Full),
        Event::ShelfUnassigned { shelf, .. } => (format!("Removed from {}", shelf), Full),
        Event::PinChanged { pinned, .. } => {
            let text = if *pinned { "Pinned" } else { "Unpinned" };
            (text.to_string(), Full)
        }
        Event::FinishedChanged { finished, .. } => {
            let text = if *finished {
                "Marked as finished"
            } else {
                "Marked as not finished"
            };
            (text.to_string(), Full)
        }
        Event::PositionTick { .. }
        | Event::FileChanged { .. }
        | Event::LoopWrapped { .. }
        | Event::BookAdded { .. }
        | Event::BookUpdated { .. } => return None,
    };
    Some(message)
}

/// Speaks dispatched events, filtered by verbosity and window focus
pub struct Announcer {
    channel: Box<dyn AccessibilityChannel>,
    verbosity: Verbosity,
    announce_when_unfocused: bool,
    focus: FocusHandle,
}

impl Announcer {
    pub fn new(channel: Box<dyn AccessibilityChannel>, config: &AccessibilityConfig) -> Self {
        Self {
            channel,
            verbosity: config.verbosity,
            announce_when_unfocused: config.announce_when_unfocused,
            focus: FocusHandle::default(),
        }
    }

    pub fn with_focus(mut self, focus: FocusHandle) -> Self {
        self.focus = focus;
        self
    }

    pub fn focus(&self) -> FocusHandle {
        self.focus.clone()
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// Speaks `text` if the current settings allow it. Returns true if spoken.
    pub fn speak(&mut self, text: &str, importance: Importance) -> bool {
        if !self.focus.is_focused()
            && !self.announce_when_unfocused
            && importance != Importance::Critical
        {
            return false;
        }
        if !importance.allowed_at(self.verbosity) {
            return false;
        }
        log::debug!("Announcing: {}", text);
        self.channel.announce(text);
        true
    }
}

impl Subscriber for Announcer {
    fn on_event(&mut self, event: &Event) {
        if let Some((text, importance)) = describe(event) {
            self.speak(&text, importance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::BookKey;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Spoken(Arc<Mutex<Vec<String>>>);

    impl AccessibilityChannel for Spoken {
        fn announce(&mut self, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
    }

    fn build(verbosity: Verbosity, when_unfocused: bool) -> (Announcer, Spoken) {
        let spoken = Spoken::default();
        let config = AccessibilityConfig {
            verbosity,
            announce_when_unfocused: when_unfocused,
        };
        (Announcer::new(Box::new(spoken.clone()), &config), spoken)
    }

    fn key() -> BookKey {
        BookKey::from_string("k")
    }

    #[test]
    fn test_natural_language_messages() {
        let text = |e: Event| describe(&e).map(|(t, _)| t);
        assert_eq!(
            text(Event::TimerExpiring {
                remaining_secs: 299.6
            }),
            Some("5 minutes remaining".to_string())
        );
        assert_eq!(
            text(Event::RateChanged {
                key: key(),
                rate: 1.5
            }),
            Some("Speed 1.5x".to_string())
        );
        assert_eq!(
            text(Event::PositionJumped {
                key: key(),
                position: 750.0,
                cause: JumpCause::Seek
            }),
            Some("Jumped to 0:12:30".to_string())
        );
        assert_eq!(
            text(Event::PositionTick {
                key: key(),
                position: 1.0,
                duration: None
            }),
            None
        );
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(Importance::Full.allowed_at(Verbosity::Full));
        assert!(!Importance::Full.allowed_at(Verbosity::Minimal));
        assert!(Importance::Minimal.allowed_at(Verbosity::Minimal));
        assert!(!Importance::Minimal.allowed_at(Verbosity::Silent));
        assert!(Importance::Critical.allowed_at(Verbosity::Silent));
    }

    #[test]
    fn test_minimal_verbosity_filters_chatter() {
        let (mut announcer, spoken) = build(Verbosity::Minimal, true);
        announcer.on_event(&Event::VolumeChanged {
            key: key(),
            volume: 40,
        });
        announcer.on_event(&Event::Finished { key: key() });
        assert_eq!(*spoken.0.lock().unwrap(), vec!["End of book"]);
    }

    #[test]
    fn test_unfocused_only_critical_unless_enabled() {
        let (mut announcer, spoken) = build(Verbosity::Full, false);
        announcer.focus().set_focused(false);

        assert!(!announcer.speak("Paused", Importance::Full));
        assert!(announcer.speak("Cannot play x.mp3", Importance::Critical));
        assert_eq!(spoken.0.lock().unwrap().len(), 1);

        let (mut chatty, _) = build(Verbosity::Full, true);
        chatty.focus().set_focused(false);
        assert!(chatty.speak("Paused", Importance::Full));
    }
}
