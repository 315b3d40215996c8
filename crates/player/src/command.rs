//! Messages understood by the player task

use crate::error::PlayerResult;
use lectern_core::{BookKey, BookLocator, Bookmark, LoopRange, PlaybackStatus, SessionState};
use lectern_library::LibraryManager;
use lectern_playback::{ChapterJump, LoopPress, TimerAction};
use std::time::Duration;
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<PlayerResult<T>>;

/// Work run against the library inside the player task
pub(crate) type LibraryJob = Box<dyn FnOnce(&mut LibraryManager) + Send>;

pub(crate) enum PlayerCommand {
    Open(BookKey, Reply<()>),
    Close(Reply<CloseReport>),
    Play(Reply<()>),
    Pause(Reply<()>),
    Toggle(Reply<()>),
    Stop(Reply<()>),
    SeekTo(f64, Reply<f64>),
    SeekBy(f64, Reply<f64>),
    JumpChapter(ChapterJump, Reply<bool>),
    JumpBookmark(usize, Reply<f64>),
    SetRate(f64, Reply<f64>),
    StepRate(f64, Reply<f64>),
    SetVolume(i32, Reply<u8>),
    StepVolume(i32, Reply<u8>),
    SetEqualizer(String, Reply<()>),
    PressLoopMarker(Reply<LoopPress>),
    ClearLoop(Reply<()>),
    AddBookmark(Option<String>, Reply<Bookmark>),
    StartSleepTimer(Duration, TimerAction, Reply<()>),
    CancelSleepTimer(Reply<bool>),
    Rescan(Reply<bool>),
    Library(LibraryJob),
    Snapshot(Reply<PlayerSnapshot>),
    Shutdown(Reply<CloseReport>),
}

/// Outcome of closing the open book
#[derive(Debug, Clone, PartialEq)]
pub enum CloseReport {
    NothingOpen,
    Saved,
    /// The final write failed or timed out; the caller should warn the user
    Unsaved {
        locator: BookLocator,
        state: SessionState,
        reason: String,
    },
}

impl CloseReport {
    pub fn is_saved(&self) -> bool {
        !matches!(self, Self::Unsaved { .. })
    }
}

/// Point-in-time view of the player, for status lines and tests
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub key: Option<BookKey>,
    pub title: Option<String>,
    pub position: f64,
    pub duration: Option<f64>,
    pub rate: f64,
    pub volume: u8,
    pub loop_range: Option<LoopRange>,
    pub bookmarks: usize,
    pub sleep_timer: Option<Duration>,
    pub scanning: bool,
}
