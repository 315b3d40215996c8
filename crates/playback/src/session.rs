//! The playback session: one open book bound to the transport
//!
//! Positions handled here are global: seconds from the start of the book,
//! across every file. The [`Timeline`] maps them onto the transport's
//! per-file offsets.

use crate::error::{SessionError, SessionResult, TransportError};
use crate::transport::{Transport, TransportEvent};
use lectern_config::PlayerConfig;
use lectern_core::{
    clamp_rate, insert_sorted, Book, BookKey, BookLocator, Bookmark, Event, JumpCause, LoopRange,
    PlaybackStatus, SessionState, Timeline, Timestamp, MAX_VOLUME,
};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Leeway before "previous chapter" restarts the current chapter instead
const CHAPTER_RESTART_GRACE_SECS: f64 = 3.0;

/// Resume behaviour taken from the player configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub smart_resume: bool,
    /// Idle time after which resuming rewinds
    pub idle_threshold_secs: f64,
    pub rewind_secs: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&PlayerConfig::default())
    }
}

impl From<&PlayerConfig> for SessionSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            smart_resume: config.smart_resume,
            idle_threshold_secs: config.resume_idle_threshold_secs as f64,
            rewind_secs: config.resume_rewind_secs.max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterJump {
    Next,
    Previous,
}

/// What a press of the loop marker key did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopPress {
    AnchorSet(f64),
    Engaged(LoopRange),
    Cleared,
    /// Second marker landed on the anchor
    Ignored,
}

/// Smart resume target for stored position `position`.
///
/// Rewinds by `rewind`, but never past an A marker that sits inside the
/// rewind window.
pub fn smart_resume_target(position: f64, rewind: f64, marker: Option<f64>) -> f64 {
    let rewound = (position - rewind).max(0.0);
    match marker {
        Some(m) if m <= position && m > position - rewind => m,
        _ => rewound,
    }
}

fn quantize_rate(rate: f64) -> f64 {
    (clamp_rate(rate) * 1000.0).round() / 1000.0
}

struct LoadedBook {
    book: Book,
    timeline: Timeline,
    file_index: usize,
    /// Offset in the open file at the last poll
    file_offset: f64,
}

/// Per-book playback state machine.
///
/// Every transition is reported as an [`Event`] in the session outbox,
/// drained with [`PlaybackSession::drain_events`].
pub struct PlaybackSession {
    transport: Box<dyn Transport>,
    settings: SessionSettings,
    status: PlaybackStatus,
    loaded: Option<LoadedBook>,
    state: SessionState,
    anchor: Option<f64>,
    /// Seek target waiting for a file duration to become known
    deferred: Option<f64>,
    paused_at: Option<Timestamp>,
    revision: u64,
    flush_requested: bool,
    events: Vec<Event>,
}

impl PlaybackSession {
    pub fn new(transport: Box<dyn Transport>, settings: SessionSettings) -> Self {
        Self {
            transport,
            settings,
            status: PlaybackStatus::Idle,
            loaded: None,
            state: SessionState::default(),
            anchor: None,
            deferred: None,
            paused_at: None,
            revision: 0,
            flush_requested: false,
            events: Vec::new(),
        }
    }

    // Accessors

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn book(&self) -> Option<&Book> {
        self.loaded.as_ref().map(|l| &l.book)
    }

    pub fn key(&self) -> Option<&BookKey> {
        self.book().map(|b| &b.key)
    }

    pub fn locator(&self) -> Option<BookLocator> {
        self.book().map(Book::locator)
    }

    /// Current global position, including a seek still waiting for a duration
    pub fn position(&self) -> f64 {
        self.deferred.unwrap_or(self.state.position)
    }

    /// Total duration, when every file's duration is known
    pub fn duration(&self) -> Option<f64> {
        self.loaded.as_ref().and_then(|l| l.timeline.total())
    }

    pub fn file_index(&self) -> Option<usize> {
        self.loaded.as_ref().map(|l| l.file_index)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn loop_range(&self) -> Option<LoopRange> {
        self.state.loop_range
    }

    pub fn loop_anchor(&self) -> Option<f64> {
        self.anchor
    }

    pub fn has_deferred_position(&self) -> bool {
        self.deferred.is_some()
    }

    /// Bumped on every persisted change other than position
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The state as it should be persisted right now
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// The state to hand to the store at `now`.
    ///
    /// While playing, `last_played` becomes `now`, so smart resume measures
    /// idleness from the last save. Does not bump the revision.
    pub fn checkpoint(&mut self, now: Timestamp) -> SessionState {
        if self.status.is_playing() {
            self.state.last_played = Some(now);
        }
        self.snapshot()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// True once after `stop`, end of book or similar asked for an immediate save
    pub fn take_flush_request(&mut self) -> bool {
        std::mem::take(&mut self.flush_requested)
    }

    fn loaded(&self) -> SessionResult<&LoadedBook> {
        self.loaded.as_ref().ok_or(SessionError::NotLoaded)
    }

    fn loaded_key(&self) -> SessionResult<BookKey> {
        Ok(self.loaded()?.book.key.clone())
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        if let Some(loaded) = &self.loaded {
            self.events.push(Event::StatusChanged {
                key: loaded.book.key.clone(),
                status,
            });
        }
    }

    fn clamp_position(&self, position: f64) -> f64 {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        match self.duration() {
            Some(total) => position.min(total),
            None => position,
        }
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.loaded
            .as_ref()
            .and_then(|l| l.book.files.get(l.file_index))
            .map(|f| f.path.clone())
    }

    fn report_unavailable(&mut self, path: PathBuf, reason: String) -> SessionError {
        warn!("Media unavailable at {}: {}", path.display(), reason);
        self.events.push(Event::MediaUnavailable {
            key: self.key().cloned(),
            path: path.clone(),
            reason: reason.clone(),
        });
        SessionError::MediaUnavailable { path, reason }
    }

    // Opening and closing

    /// Binds `book` to the transport and restores its stored state.
    ///
    /// Ends `Paused`. Smart resume rewinds when the book has been idle longer
    /// than the configured threshold.
    pub fn open(&mut self, book: &Book, stored: SessionState, now: Timestamp) -> SessionResult<()> {
        if self.status != PlaybackStatus::Idle {
            return Err(SessionError::Busy(self.status));
        }
        if book.files.is_empty() {
            return Err(SessionError::EmptyBook(book.key.clone()));
        }

        info!("Opening '{}'", book.title);
        self.status = PlaybackStatus::Loading;

        let timeline = Timeline::from_files(&book.files);
        let mut state = stored;
        state.sanitize(timeline.total());

        let stored_position = state.position;
        let idle = state
            .last_played
            .is_some_and(|last| now.secs_since(last) > self.settings.idle_threshold_secs);
        let target = if self.settings.smart_resume && idle {
            smart_resume_target(
                stored_position,
                self.settings.rewind_secs,
                state.loop_range.map(|r| r.a()),
            )
        } else {
            stored_position
        };

        let (file_index, offset) = timeline.locate(target).unwrap_or((0, 0.0));
        let path = book.files[file_index].path.clone();

        let bound = self
            .transport
            .open(&path)
            .and_then(|_| self.transport.seek(offset));
        if let Err(e) = bound {
            self.status = PlaybackStatus::Idle;
            self.events.push(Event::MediaUnavailable {
                key: Some(book.key.clone()),
                path: path.clone(),
                reason: e.to_string(),
            });
            warn!("Could not open '{}': {}", book.title, e);
            return Err(SessionError::MediaUnavailable {
                path,
                reason: e.to_string(),
            });
        }

        state.position = target;
        self.state = state;
        self.apply_output_settings();
        self.anchor = None;
        self.deferred = None;
        self.paused_at = None;
        self.flush_requested = false;
        self.loaded = Some(LoadedBook {
            book: book.clone(),
            timeline,
            file_index,
            file_offset: offset,
        });

        self.events.push(Event::TrackChanged {
            key: book.key.clone(),
            title: book.title.clone(),
        });
        self.set_status(PlaybackStatus::Paused);
        if target != stored_position {
            debug!("Smart resume: {:.1}s -> {:.1}s", stored_position, target);
            self.events.push(Event::SmartResumed {
                key: book.key.clone(),
                from: stored_position,
                to: target,
            });
        }
        Ok(())
    }

    /// Unbinds the book. Returns what must be flushed to the state store.
    pub fn close(&mut self, now: Timestamp) -> Option<(BookLocator, SessionState)> {
        let loaded = self.loaded.as_ref()?;
        let locator = loaded.book.locator();
        if self.status.is_playing() {
            self.poll_position();
            if let Err(e) = self.transport.pause() {
                debug!("Transport pause on close failed: {}", e);
            }
        }
        let state = self.checkpoint(now);

        self.set_status(PlaybackStatus::Idle);
        self.loaded = None;
        self.anchor = None;
        self.deferred = None;
        self.paused_at = None;
        self.flush_requested = false;
        info!("Closed book {}", locator.key);
        Some((locator, state))
    }

    fn apply_output_settings(&mut self) {
        let rate = self.state.rate;
        let volume = self.state.volume;
        let equalizer = self.state.equalizer.clone();
        if let Err(e) = self.transport.set_rate(rate) {
            warn!("Transport rejected rate {}: {}", rate, e);
        }
        if let Err(e) = self.transport.set_volume(volume) {
            warn!("Transport rejected volume {}: {}", volume, e);
        }
        if let Err(e) = self.transport.set_equalizer(&equalizer) {
            warn!("Transport rejected equalizer {}: {}", equalizer, e);
        }
    }

    // Transport movement

    /// Points the transport at a global position, switching files if needed
    fn move_transport(&mut self, target: f64, resume: bool) -> SessionResult<()> {
        let loaded = self.loaded()?;
        let (index, offset) = loaded.timeline.locate(target).unwrap_or((0, 0.0));
        let switch = index != loaded.file_index;
        let path = loaded.book.files[index].path.clone();
        let key = loaded.book.key.clone();

        if switch {
            if let Err(e) = self.transport.open(&path) {
                self.set_status(PlaybackStatus::Paused);
                return Err(self.report_unavailable(path, e.to_string()));
            }
            self.apply_output_settings();
            if let Some(loaded) = self.loaded.as_mut() {
                loaded.file_index = index;
            }
            self.events.push(Event::FileChanged {
                key,
                index,
                path: path.clone(),
            });
        }

        self.transport.seek(offset)?;
        if switch && resume {
            self.transport.play()?;
        }
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.file_offset = offset;
        }
        Ok(())
    }

    // Transport control

    pub fn play(&mut self, now: Timestamp) -> SessionResult<()> {
        let key = self.loaded_key()?;
        match self.status {
            PlaybackStatus::Playing => return Ok(()),
            PlaybackStatus::Ended => {
                self.state.position = 0.0;
                self.move_transport(0.0, false)?;
            }
            PlaybackStatus::Paused => {
                let idle = self
                    .paused_at
                    .is_some_and(|at| now.secs_since(at) > self.settings.idle_threshold_secs);
                if self.settings.smart_resume && idle {
                    let from = self.position();
                    let to = smart_resume_target(
                        from,
                        self.settings.rewind_secs,
                        self.state.loop_range.map(|r| r.a()),
                    );
                    if to != from {
                        self.move_transport(to, false)?;
                        self.state.position = to;
                        self.deferred = None;
                        self.events.push(Event::SmartResumed {
                            key: key.clone(),
                            from,
                            to,
                        });
                    }
                }
            }
            _ => {}
        }

        self.transport.play()?;
        self.paused_at = None;
        self.state.last_played = Some(now);
        self.touch();
        self.set_status(PlaybackStatus::Playing);
        Ok(())
    }

    pub fn pause(&mut self, now: Timestamp) -> SessionResult<()> {
        self.loaded()?;
        if !self.status.is_playing() && self.status != PlaybackStatus::Seeking {
            return Ok(());
        }
        self.poll_position();
        self.transport.pause()?;
        self.paused_at = Some(now);
        self.state.last_played = Some(now);
        self.touch();
        self.set_status(PlaybackStatus::Paused);
        Ok(())
    }

    pub fn toggle(&mut self, now: Timestamp) -> SessionResult<()> {
        if self.status.is_playing() {
            self.pause(now)
        } else {
            self.play(now)
        }
    }

    /// Rewinds to the start, clears the loop and asks for an immediate save
    pub fn stop(&mut self) -> SessionResult<()> {
        let key = self.loaded_key()?;
        if self.status == PlaybackStatus::Stopped {
            return Ok(());
        }
        if self.status.is_playing() {
            self.transport.pause()?;
        }
        self.move_transport(0.0, false)?;
        self.state.position = 0.0;
        self.deferred = None;
        self.paused_at = None;
        self.anchor = None;
        if self.state.loop_range.take().is_some() {
            self.events.push(Event::LoopCleared { key: key.clone() });
        }
        self.touch();
        self.flush_requested = true;
        self.set_status(PlaybackStatus::Stopped);
        self.events.push(Event::PositionJumped {
            key,
            position: 0.0,
            cause: JumpCause::Stop,
        });
        Ok(())
    }

    pub fn seek_to(&mut self, position: f64) -> SessionResult<f64> {
        self.jump(position, JumpCause::Seek)
    }

    pub fn seek_by(&mut self, delta: f64) -> SessionResult<f64> {
        let target = self.position() + delta;
        self.jump(target, JumpCause::Seek)
    }

    fn jump(&mut self, position: f64, cause: JumpCause) -> SessionResult<f64> {
        let key = self.loaded_key()?;
        let target = self.clamp_position(position);
        let previous = self.status;
        let playing = previous.is_playing();

        self.status = PlaybackStatus::Seeking;
        let moved = self.move_transport(target, playing);
        self.status = previous;
        moved?;

        // A target past an unknown file end waits for that duration
        let resolved = self
            .loaded
            .as_ref()
            .and_then(|l| l.timeline.locate(target))
            .and_then(|(index, _)| {
                self.loaded
                    .as_ref()
                    .and_then(|l| l.timeline.file_duration(index))
            })
            .is_some();
        if resolved || self.duration().is_some() {
            self.state.position = target;
            self.deferred = None;
        } else {
            self.deferred = Some(target);
        }

        if matches!(previous, PlaybackStatus::Stopped | PlaybackStatus::Ended) {
            self.set_status(PlaybackStatus::Paused);
        }
        self.events.push(Event::PositionJumped {
            key,
            position: target,
            cause,
        });
        Ok(target)
    }

    /// Jumps to the next chapter, or back to the current/previous one.
    /// Returns false when there is nowhere to go.
    pub fn jump_to_chapter(&mut self, direction: ChapterJump) -> SessionResult<bool> {
        let position = self.position();
        let starts: Vec<f64> = self.loaded()?.book.chapters.iter().map(|c| c.start).collect();

        let target = match direction {
            ChapterJump::Next => starts.iter().copied().find(|s| *s > position + 0.5),
            ChapterJump::Previous => starts
                .iter()
                .copied()
                .rev()
                .find(|s| *s < position - CHAPTER_RESTART_GRACE_SECS)
                .or_else(|| starts.first().copied()),
        };

        match target {
            Some(start) => {
                self.jump(start, JumpCause::Chapter)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn jump_to_bookmark(&mut self, index: usize) -> SessionResult<f64> {
        let offset = self
            .state
            .bookmarks
            .get(index)
            .map(|b| b.offset)
            .ok_or(SessionError::NoSuchBookmark(index))?;
        self.jump(offset, JumpCause::Bookmark)
    }

    // Transport feedback

    /// Reads the transport's position (and file duration) into the session.
    /// Emits a position tick while playing.
    pub fn poll_position(&mut self) {
        let Some(index) = self.file_index() else {
            return;
        };

        if let Some(duration) = self.transport.duration() {
            self.update_file_duration(index, duration);
        }

        let offset = match self.transport.position() {
            Ok(offset) if offset.is_finite() => offset.max(0.0),
            Ok(_) => return,
            Err(e) => {
                debug!("Position poll failed: {}", e);
                return;
            }
        };

        let global = match self.loaded.as_mut() {
            Some(loaded) => {
                loaded.file_offset = offset;
                loaded.timeline.global(index, offset)
            }
            None => return,
        };

        // A position the transport reports supersedes any deferred seek
        if let Some(global) = global {
            self.state.position = self.clamp_position(global);
            self.deferred = None;
        }

        if self.status.is_playing() {
            if let Some(loaded) = &self.loaded {
                self.events.push(Event::PositionTick {
                    key: loaded.book.key.clone(),
                    position: self.deferred.unwrap_or(self.state.position),
                    duration: loaded.timeline.total(),
                });
            }
        }
    }

    /// Records a file duration learned from the transport or a probe.
    ///
    /// Resolves a deferred seek once the timeline can place it. Returns true
    /// if the duration was new.
    pub fn update_file_duration(&mut self, index: usize, secs: f64) -> bool {
        let changed = match self.loaded.as_mut() {
            Some(loaded) => {
                let changed = loaded.timeline.set_duration(index, secs);
                if changed {
                    if let Some(file) = loaded.book.files.get_mut(index) {
                        file.duration = Some(secs);
                    }
                }
                changed
            }
            None => false,
        };
        if !changed {
            return false;
        }

        if let Some(target) = self.deferred {
            let placeable = self
                .loaded
                .as_ref()
                .and_then(|l| l.timeline.locate(target))
                .and_then(|(i, _)| self.loaded.as_ref().and_then(|l| l.timeline.file_duration(i)))
                .is_some();
            if placeable {
                let clamped = self.clamp_position(target);
                self.deferred = None;
                self.state.position = clamped;
                if clamped != target {
                    let playing = self.status.is_playing();
                    if let Err(e) = self.move_transport(clamped, playing) {
                        warn!("Could not apply deferred position: {}", e);
                    }
                }
            }
        } else {
            self.state.position = self.clamp_position(self.state.position);
        }
        true
    }

    /// Reacts to end-of-file and transport failures
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> SessionResult<()> {
        let key = self.loaded_key()?;
        match event {
            TransportEvent::Ended => {
                let (index, offset, last) = {
                    let loaded = self.loaded()?;
                    (loaded.file_index, loaded.file_offset, loaded.book.files.len() - 1)
                };
                if offset > 0.0 {
                    // The end offset is the duration if nobody told us before
                    let known = self
                        .loaded
                        .as_ref()
                        .and_then(|l| l.timeline.file_duration(index))
                        .is_some();
                    if !known {
                        self.update_file_duration(index, offset);
                    }
                }

                if index < last {
                    let next_start = self
                        .loaded
                        .as_ref()
                        .and_then(|l| l.timeline.file_start(index + 1));
                    match next_start {
                        Some(start) => {
                            self.move_transport(start, self.status.is_playing())?;
                            self.state.position = start;
                            self.deferred = None;
                        }
                        None => {
                            return Err(SessionError::Transport(TransportError::Failed(
                                "file boundary unknown".to_string(),
                            )))
                        }
                    }
                    debug!("Advanced to file {} of {}", index + 2, last + 1);
                    return Ok(());
                }

                let end = self.duration().unwrap_or(self.state.position);
                self.state.position = end;
                self.deferred = None;
                self.state.finished = true;
                self.touch();
                self.flush_requested = true;
                self.set_status(PlaybackStatus::Ended);
                self.events.push(Event::Finished { key });
                info!("Reached the end of the book");
                Ok(())
            }
            TransportEvent::Error(message) => {
                let path = self.current_path().unwrap_or_default();
                self.set_status(PlaybackStatus::Paused);
                self.paused_at = None;
                Err(self.report_unavailable(path, message))
            }
        }
    }

    // A-B loop

    /// Cycles anchor, complete loop, cleared
    pub fn press_loop_marker(&mut self) -> SessionResult<LoopPress> {
        let key = self.loaded_key()?;
        let position = self.position();

        if self.state.loop_range.is_some() {
            self.clear_loop()?;
            return Ok(LoopPress::Cleared);
        }

        match self.anchor {
            Some(anchor) => match LoopRange::new(anchor, position) {
                Some(range) => {
                    self.anchor = None;
                    self.state.loop_range = Some(range);
                    self.touch();
                    self.events.push(Event::LoopEngaged { key, range });
                    Ok(LoopPress::Engaged(range))
                }
                None => Ok(LoopPress::Ignored),
            },
            None => {
                self.anchor = Some(position);
                self.events.push(Event::LoopAnchorSet { key, at: position });
                Ok(LoopPress::AnchorSet(position))
            }
        }
    }

    /// Sets both markers at once. Returns false for an empty range.
    pub fn set_loop(&mut self, a: f64, b: f64) -> SessionResult<bool> {
        let key = self.loaded_key()?;
        let Some(range) = LoopRange::new(self.clamp_position(a), self.clamp_position(b)) else {
            return Ok(false);
        };
        self.anchor = None;
        self.state.loop_range = Some(range);
        self.touch();
        self.events.push(Event::LoopEngaged { key, range });
        Ok(true)
    }

    pub fn clear_loop(&mut self) -> SessionResult<()> {
        let key = self.loaded_key()?;
        let had_anchor = self.anchor.take().is_some();
        if self.state.loop_range.take().is_some() {
            self.touch();
            self.events.push(Event::LoopCleared { key });
        } else if had_anchor {
            self.events.push(Event::LoopCleared { key });
        }
        Ok(())
    }

    /// Wraps back to A once playback reaches B. Returns true if it wrapped.
    pub fn check_loop(&mut self) -> SessionResult<bool> {
        let Some(range) = self.state.loop_range else {
            return Ok(false);
        };
        if self.status != PlaybackStatus::Playing || !range.should_wrap(self.position()) {
            return Ok(false);
        }
        let key = self.loaded_key()?;
        self.move_transport(range.a(), true)?;
        self.state.position = range.a();
        self.deferred = None;
        self.events.push(Event::LoopWrapped { key, range });
        Ok(true)
    }

    // Output settings

    /// Returns the applied rate
    pub fn set_rate(&mut self, rate: f64) -> SessionResult<f64> {
        let key = self.loaded_key()?;
        let rate = quantize_rate(rate);
        if rate == self.state.rate {
            return Ok(rate);
        }
        self.transport.set_rate(rate)?;
        self.state.rate = rate;
        self.touch();
        self.events.push(Event::RateChanged { key, rate });
        Ok(rate)
    }

    pub fn step_rate(&mut self, delta: f64) -> SessionResult<f64> {
        let rate = self.state.rate + delta;
        self.set_rate(rate)
    }

    /// Returns the applied volume
    pub fn set_volume(&mut self, volume: i32) -> SessionResult<u8> {
        let key = self.loaded_key()?;
        let volume = volume.clamp(0, MAX_VOLUME as i32) as u8;
        if volume == self.state.volume {
            return Ok(volume);
        }
        self.transport.set_volume(volume)?;
        self.state.volume = volume;
        self.touch();
        self.events.push(Event::VolumeChanged { key, volume });
        Ok(volume)
    }

    pub fn step_volume(&mut self, delta: i32) -> SessionResult<u8> {
        let volume = self.state.volume as i32 + delta;
        self.set_volume(volume)
    }

    pub fn set_equalizer(&mut self, preset: &str) -> SessionResult<()> {
        let key = self.loaded_key()?;
        let preset = preset.trim();
        if preset.is_empty() || preset == self.state.equalizer {
            return Ok(());
        }
        self.transport.set_equalizer(preset)?;
        self.state.equalizer = preset.to_string();
        self.touch();
        self.events.push(Event::EqualizerChanged {
            key,
            preset: preset.to_string(),
        });
        Ok(())
    }

    /// Scales the transport volume without touching the stored level
    pub(crate) fn apply_fade(&mut self, factor: f64) {
        let faded = (self.state.volume as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        if let Err(e) = self.transport.set_volume(faded) {
            debug!("Fade step failed: {}", e);
        }
    }

    pub(crate) fn restore_volume(&mut self) {
        let volume = self.state.volume;
        if let Err(e) = self.transport.set_volume(volume) {
            debug!("Volume restore failed: {}", e);
        }
    }

    // Bookmarks

    pub fn add_bookmark(&mut self, label: Option<&str>, now: Timestamp) -> SessionResult<Bookmark> {
        let key = self.loaded_key()?;
        let offset = self.position();
        let bookmark = match label {
            Some(label) => Bookmark::with_label(offset, label, now),
            None => Bookmark::new(offset, now),
        };
        insert_sorted(&mut self.state.bookmarks, bookmark.clone());
        self.touch();
        self.events.push(Event::BookmarkAdded {
            key,
            bookmark: bookmark.clone(),
        });
        Ok(bookmark)
    }

    pub fn set_finished(&mut self, finished: bool) -> SessionResult<()> {
        self.loaded()?;
        if self.state.finished != finished {
            self.state.finished = finished;
            self.touch();
        }
        Ok(())
    }
}
