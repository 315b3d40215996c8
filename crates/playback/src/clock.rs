//! Periodic tick: position polling, loop wrap, sleep timer, debounced saves

use crate::session::PlaybackSession;
use lectern_config::{PlayerConfig, SleepTimerAction};
use lectern_core::{BookKey, BookLocator, Event, SessionState, TimerActionKind, Timestamp};
use log::{debug, info, warn};
use std::fmt;
use std::time::Duration;

/// Timing behaviour taken from the player configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClockSettings {
    pub interval: Duration,
    /// Unsaved position drift that is saved once the position settles
    pub save_threshold_secs: f64,
    /// Unsaved position drift that is saved even while the position moves
    pub save_max_drift_secs: f64,
    /// Lead time of the "timer expiring" warning
    pub warning_secs: f64,
    /// Length of the volume fade before the timer fires; 0 disables it
    pub fade_secs: f64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self::from(&PlayerConfig::default())
    }
}

impl From<&PlayerConfig> for ClockSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            interval: config.tick_interval(),
            save_threshold_secs: config.save_threshold_secs,
            save_max_drift_secs: config.save_max_drift_secs,
            warning_secs: config.timer_warning_secs as f64,
            fade_secs: config.timer_fade_secs as f64,
        }
    }
}

/// A session state that should be written to the state store
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub locator: BookLocator,
    pub state: SessionState,
    pub revision: u64,
    /// Handed back to [`ClockService::save_completed`] once the write is done
    pub ticket: u64,
}

/// What the sleep timer does when it runs out
pub enum TimerAction {
    Pause,
    Stop,
    Custom(Box<dyn FnMut(&mut PlaybackSession) + Send>),
}

impl TimerAction {
    pub fn kind(&self) -> TimerActionKind {
        match self {
            Self::Pause => TimerActionKind::Pause,
            Self::Stop => TimerActionKind::Stop,
            Self::Custom(_) => TimerActionKind::Custom,
        }
    }
}

impl fmt::Debug for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => write!(f, "Pause"),
            Self::Stop => write!(f, "Stop"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl From<SleepTimerAction> for TimerAction {
    fn from(action: SleepTimerAction) -> Self {
        match action {
            SleepTimerAction::Pause => Self::Pause,
            SleepTimerAction::Stop => Self::Stop,
        }
    }
}

#[derive(Debug)]
struct SleepTimer {
    remaining_secs: f64,
    action: TimerAction,
    warned: bool,
    fading: bool,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: u64,
    position: f64,
    revision: u64,
}

/// Tracks what was last written for the open book
#[derive(Debug, Default)]
struct Debouncer {
    key: Option<BookKey>,
    saved_position: f64,
    saved_revision: u64,
    /// Position at the previous tick
    last_seen: f64,
    /// Newest write handed out and not yet reported back
    in_flight: Option<InFlight>,
    flush_pending: bool,
}

impl Debouncer {
    fn rebase(&mut self, key: BookKey, position: f64, revision: u64) {
        *self = Self {
            key: Some(key),
            saved_position: position,
            saved_revision: revision,
            last_seen: position,
            in_flight: None,
            flush_pending: false,
        };
    }
}

/// Drives a [`PlaybackSession`] from a periodic tick
#[derive(Debug)]
pub struct ClockService {
    settings: ClockSettings,
    debounce: Debouncer,
    next_ticket: u64,
    timer: Option<SleepTimer>,
    events: Vec<Event>,
}

impl ClockService {
    pub fn new(settings: ClockSettings) -> Self {
        Self {
            settings,
            debounce: Debouncer::default(),
            next_ticket: 0,
            timer: None,
            events: Vec::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.settings.interval
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// One clock tick. Returns a save request when the session is dirty and
    /// no earlier write for the book is still in flight.
    pub fn tick(&mut self, session: &mut PlaybackSession, now: Timestamp) -> Option<SaveRequest> {
        session.poll_position();

        if let Err(e) = session.check_loop() {
            warn!("Loop wrap failed: {}", e);
        }

        self.step_timer(session, now);
        self.debounce(session, now)
    }

    /// Setting changes and flush requests are written on the next tick.
    /// Position drift waits until the position holds still for a tick, so a
    /// burst of seeks or steps lands as one write of where it ended. Steady
    /// playback never holds still and is written every `save_max_drift_secs`.
    fn debounce(&mut self, session: &mut PlaybackSession, now: Timestamp) -> Option<SaveRequest> {
        let locator = session.locator()?;
        self.follow(&locator.key, session);
        if session.take_flush_request() {
            self.debounce.flush_pending = true;
        }

        let position = session.position();
        let settled = position == self.debounce.last_seen;
        self.debounce.last_seen = position;
        if self.debounce.in_flight.is_some() {
            return None;
        }

        let drift = (position - self.debounce.saved_position).abs();
        let max_drift = self
            .settings
            .save_max_drift_secs
            .max(self.settings.save_threshold_secs);
        let due = self.debounce.flush_pending
            || session.revision() != self.debounce.saved_revision
            || drift >= max_drift
            || (settled && drift >= self.settings.save_threshold_secs);
        if !due {
            return None;
        }
        Some(self.issue(session, locator, now))
    }

    fn follow(&mut self, key: &BookKey, session: &PlaybackSession) {
        if self.debounce.key.as_ref() != Some(key) {
            self.debounce
                .rebase(key.clone(), session.position(), session.revision());
        }
    }

    fn issue(
        &mut self,
        session: &mut PlaybackSession,
        locator: BookLocator,
        now: Timestamp,
    ) -> SaveRequest {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let position = session.position();
        let revision = session.revision();
        if let Some(superseded) = self.debounce.in_flight {
            debug!("Save {} supersedes save {}", ticket, superseded.ticket);
        }
        self.debounce.flush_pending = false;
        self.debounce.in_flight = Some(InFlight {
            ticket,
            position,
            revision,
        });

        let mut state = session.checkpoint(now);
        state.position = position;
        SaveRequest {
            locator,
            state,
            revision,
            ticket,
        }
    }

    /// Reports the outcome of the write with `ticket`.
    ///
    /// Only the newest write counts. A superseded write finishing late, or
    /// one for a book that was closed since, is ignored.
    pub fn save_completed(&mut self, ticket: u64, ok: bool) {
        let current = self.debounce.in_flight.filter(|w| w.ticket == ticket);
        let Some(write) = current else {
            debug!("Ignoring completion of superseded save {}", ticket);
            return;
        };
        self.debounce.in_flight = None;
        if ok {
            self.debounce.saved_position = write.position;
            self.debounce.saved_revision = write.revision;
        } else {
            // Retried on the next tick
            self.debounce.flush_pending = true;
        }
    }

    /// Save request for the current state, skipping the debounce window.
    /// It supersedes any write still in flight.
    pub fn force_save(
        &mut self,
        session: &mut PlaybackSession,
        now: Timestamp,
    ) -> Option<SaveRequest> {
        let locator = session.locator()?;
        self.follow(&locator.key, session);
        session.take_flush_request();
        self.debounce.last_seen = session.position();
        Some(self.issue(session, locator, now))
    }

    /// Like [`force_save`](Self::force_save), but only when the session asked
    /// for an immediate save (stop, end of book)
    pub fn take_flush(
        &mut self,
        session: &mut PlaybackSession,
        now: Timestamp,
    ) -> Option<SaveRequest> {
        if !session.take_flush_request() {
            return None;
        }
        self.force_save(session, now)
    }

    /// Takes the freshly opened session's state as the saved baseline
    pub fn track(&mut self, session: &PlaybackSession) {
        if let Some(key) = session.key() {
            self.debounce
                .rebase(key.clone(), session.position(), session.revision());
        }
    }

    /// Forgets the book being debounced, after it was closed and flushed
    pub fn reset(&mut self) {
        self.debounce = Debouncer::default();
    }

    /// True while the newest write handed out has not been reported back
    pub fn has_save_in_flight(&self) -> bool {
        self.debounce.in_flight.is_some()
    }

    // Sleep timer

    pub fn start_sleep_timer(
        &mut self,
        session: &mut PlaybackSession,
        duration: Duration,
        action: TimerAction,
    ) {
        if let Some(previous) = self.timer.take() {
            debug!("Replacing pending sleep timer");
            if previous.fading {
                session.restore_volume();
            }
        }
        let secs = duration.as_secs_f64();
        info!("Sleep timer set for {:.0}s ({:?})", secs, action);
        self.events.push(Event::TimerStarted {
            duration_secs: secs,
            action: action.kind(),
        });
        self.timer = Some(SleepTimer {
            remaining_secs: secs,
            action,
            warned: false,
            fading: false,
        });
    }

    /// Returns false if no timer was pending
    pub fn cancel_sleep_timer(&mut self, session: &mut PlaybackSession) -> bool {
        match self.timer.take() {
            Some(timer) => {
                if timer.fading {
                    session.restore_volume();
                }
                self.events.push(Event::TimerCancelled);
                info!("Sleep timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn sleep_timer_remaining(&self) -> Option<Duration> {
        self.timer
            .as_ref()
            .map(|t| Duration::from_secs_f64(t.remaining_secs.max(0.0)))
    }

    fn step_timer(&mut self, session: &mut PlaybackSession, now: Timestamp) {
        let Some(timer) = self.timer.as_mut() else {
            return;
        };
        timer.remaining_secs -= self.settings.interval.as_secs_f64();

        if timer.remaining_secs > 0.0 {
            if !timer.warned && timer.remaining_secs <= self.settings.warning_secs {
                timer.warned = true;
                self.events.push(Event::TimerExpiring {
                    remaining_secs: timer.remaining_secs,
                });
            }
            if self.settings.fade_secs > 0.0 && timer.remaining_secs <= self.settings.fade_secs {
                timer.fading = true;
                session.apply_fade(timer.remaining_secs / self.settings.fade_secs);
            }
            return;
        }

        // Deregister before running so the action fires exactly once
        let Some(mut timer) = self.timer.take() else {
            return;
        };
        let kind = timer.action.kind();
        info!("Sleep timer expired, running {:?}", timer.action);
        let result = match &mut timer.action {
            TimerAction::Pause => session.pause(now),
            TimerAction::Stop => session.stop(),
            TimerAction::Custom(callback) => {
                callback(session);
                Ok(())
            }
        };
        if let Err(e) = result {
            debug!("Sleep timer action had no effect: {}", e);
        }
        if timer.fading {
            session.restore_volume();
        }
        self.events.push(Event::TimerExpired { action: kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSettings;
    use crate::{Transport, TransportResult};
    use lectern_core::{Book, BookKind, MediaFile, PlaybackStatus};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Volume(Arc<Mutex<Vec<u8>>>);

    struct QuietTransport {
        volumes: Volume,
    }

    impl Transport for QuietTransport {
        fn open(&mut self, _path: &Path) -> TransportResult<()> {
            Ok(())
        }
        fn play(&mut self) -> TransportResult<()> {
            Ok(())
        }
        fn pause(&mut self) -> TransportResult<()> {
            Ok(())
        }
        fn seek(&mut self, _secs: f64) -> TransportResult<()> {
            Ok(())
        }
        fn set_rate(&mut self, _rate: f64) -> TransportResult<()> {
            Ok(())
        }
        fn set_volume(&mut self, volume: u8) -> TransportResult<()> {
            self.volumes.0.lock().unwrap().push(volume);
            Ok(())
        }
        fn position(&mut self) -> TransportResult<f64> {
            Err(crate::TransportError::Failed("no position".to_string()))
        }
    }

    fn playing_session(volumes: Volume) -> PlaybackSession {
        let mut session = PlaybackSession::new(
            Box::new(QuietTransport { volumes }),
            SessionSettings::default(),
        );
        let book = Book::new(
            "Quiet".to_string(),
            PathBuf::from("/b/quiet.mp3"),
            BookKind::SingleFile,
            vec![MediaFile::new("/b/quiet.mp3", Some(3600.0))],
        );
        session
            .open(&book, SessionState::default(), Timestamp::from_millis(0))
            .unwrap();
        session.play(Timestamp::from_millis(0)).unwrap();
        session
    }

    fn one_second_clock() -> ClockService {
        ClockService::new(ClockSettings {
            interval: Duration::from_secs(1),
            save_threshold_secs: 3.0,
            save_max_drift_secs: 30.0,
            warning_secs: 2.0,
            fade_secs: 2.0,
        })
    }

    #[test]
    fn test_unchanged_session_is_not_saved() {
        let mut session = playing_session(Volume::default());
        let mut clock = one_second_clock();
        // Rebases on the first tick, after play already bumped the revision
        clock.tick(&mut session, Timestamp::from_millis(0));
        assert!(clock.tick(&mut session, Timestamp::from_millis(1000)).is_none());
    }

    #[test]
    fn test_revision_change_saves_once_per_completion() {
        let mut session = playing_session(Volume::default());
        let mut clock = one_second_clock();
        clock.tick(&mut session, Timestamp::from_millis(0));

        session.set_rate(1.5).unwrap();
        let request = clock.tick(&mut session, Timestamp::from_millis(1000)).unwrap();
        assert_eq!(request.state.rate, 1.5);
        assert_eq!(request.state.last_played, Some(Timestamp::from_millis(1000)));

        session.set_rate(2.0).unwrap();
        assert!(clock.tick(&mut session, Timestamp::from_millis(2000)).is_none());

        clock.save_completed(request.ticket, true);
        let next = clock.tick(&mut session, Timestamp::from_millis(3000)).unwrap();
        assert_eq!(next.state.rate, 2.0);
    }

    #[test]
    fn test_forced_save_supersedes_write_in_flight() {
        let mut session = playing_session(Volume::default());
        let mut clock = one_second_clock();
        clock.tick(&mut session, Timestamp::from_millis(0));

        session.set_rate(1.5).unwrap();
        let first = clock.tick(&mut session, Timestamp::from_millis(1000)).unwrap();
        session.stop().unwrap();
        let forced = clock
            .take_flush(&mut session, Timestamp::from_millis(1200))
            .unwrap();
        assert!(forced.ticket > first.ticket);
        assert!(clock
            .take_flush(&mut session, Timestamp::from_millis(1300))
            .is_none());

        // The older write finishing late does not mark the newer one done
        clock.save_completed(first.ticket, true);
        assert!(clock.has_save_in_flight());
        clock.save_completed(forced.ticket, true);
        assert!(!clock.has_save_in_flight());
        assert!(clock.tick(&mut session, Timestamp::from_millis(2000)).is_none());
    }

    #[test]
    fn test_completion_after_reset_is_ignored() {
        let mut session = playing_session(Volume::default());
        let mut clock = one_second_clock();
        clock.tick(&mut session, Timestamp::from_millis(0));
        session.set_volume(40).unwrap();
        let request = clock.tick(&mut session, Timestamp::from_millis(1000)).unwrap();

        clock.reset();
        clock.track(&session);
        session.set_volume(60).unwrap();
        let fresh = clock.tick(&mut session, Timestamp::from_millis(2000)).unwrap();

        clock.save_completed(request.ticket, false);
        assert!(clock.has_save_in_flight());
        clock.save_completed(fresh.ticket, true);
        assert!(!clock.has_save_in_flight());
    }

    #[test]
    fn test_timer_warns_fades_and_fires_once() {
        let volumes = Volume::default();
        let mut session = playing_session(volumes.clone());
        let mut clock = one_second_clock();
        clock.start_sleep_timer(&mut session, Duration::from_secs(4), TimerAction::Pause);

        for second in 1..=6 {
            clock.tick(&mut session, Timestamp::from_millis(second * 1000));
        }

        let events = clock.drain_events();
        let expiring = events
            .iter()
            .filter(|e| matches!(e, Event::TimerExpiring { .. }))
            .count();
        let expired = events
            .iter()
            .filter(|e| matches!(e, Event::TimerExpired { .. }))
            .count();
        assert_eq!(expiring, 1);
        assert_eq!(expired, 1);
        assert_eq!(session.status(), PlaybackStatus::Paused);
        // Fade steps, then the stored level comes back
        let volumes = volumes.0.lock().unwrap();
        assert!(volumes.contains(&50));
        assert_eq!(volumes.last(), Some(&100));
        assert!(clock.sleep_timer_remaining().is_none());
    }

    #[test]
    fn test_custom_action_runs_once() {
        let mut session = playing_session(Volume::default());
        let mut clock = one_second_clock();
        let runs = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&runs);
        clock.start_sleep_timer(
            &mut session,
            Duration::from_secs(1),
            TimerAction::Custom(Box::new(move |_session| {
                *counter.lock().unwrap() += 1;
            })),
        );

        clock.tick(&mut session, Timestamp::from_millis(1000));
        clock.tick(&mut session, Timestamp::from_millis(2000));

        assert_eq!(*runs.lock().unwrap(), 1);
        assert_eq!(session.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_cancel_and_replace_timer() {
        let mut session = playing_session(Volume::default());
        let mut clock = one_second_clock();
        assert!(!clock.cancel_sleep_timer(&mut session));

        clock.start_sleep_timer(&mut session, Duration::from_secs(1), TimerAction::Stop);
        clock.start_sleep_timer(&mut session, Duration::from_secs(60), TimerAction::Pause);
        clock.tick(&mut session, Timestamp::from_millis(1000));
        assert_eq!(session.status(), PlaybackStatus::Playing);

        assert!(clock.cancel_sleep_timer(&mut session));
        assert!(clock.drain_events().contains(&Event::TimerCancelled));
    }
}
