//! Cloneable front end of the player task

use crate::command::{CloseReport, PlayerCommand, PlayerSnapshot, Reply};
use crate::error::{PlayerError, PlayerResult};
use lectern_core::{BookKey, Bookmark};
use lectern_library::LibraryManager;
use lectern_playback::{ChapterJump, LoopPress, TimerAction};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Sends commands to a running [`crate::Player`] and awaits the replies.
///
/// Every method fails with [`PlayerError::Stopped`] once the task is gone.
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
}

impl PlayerHandle {
    pub(crate) fn new(tx: mpsc::Sender<PlayerCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> PlayerCommand) -> PlayerResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| PlayerError::Stopped)?;
        rx.await.map_err(|_| PlayerError::Stopped)?
    }

    /// Opens a book from the library. Opening the book already open does nothing.
    pub async fn open(&self, key: BookKey) -> PlayerResult<()> {
        self.request(|r| PlayerCommand::Open(key, r)).await
    }

    /// Closes the open book, flushing its state with a bounded wait
    pub async fn close(&self) -> PlayerResult<CloseReport> {
        self.request(PlayerCommand::Close).await
    }

    pub async fn play(&self) -> PlayerResult<()> {
        self.request(PlayerCommand::Play).await
    }

    pub async fn pause(&self) -> PlayerResult<()> {
        self.request(PlayerCommand::Pause).await
    }

    pub async fn toggle(&self) -> PlayerResult<()> {
        self.request(PlayerCommand::Toggle).await
    }

    pub async fn stop(&self) -> PlayerResult<()> {
        self.request(PlayerCommand::Stop).await
    }

    pub async fn seek_to(&self, position: f64) -> PlayerResult<f64> {
        self.request(|r| PlayerCommand::SeekTo(position, r)).await
    }

    pub async fn seek_by(&self, delta: f64) -> PlayerResult<f64> {
        self.request(|r| PlayerCommand::SeekBy(delta, r)).await
    }

    pub async fn jump_to_chapter(&self, direction: ChapterJump) -> PlayerResult<bool> {
        self.request(|r| PlayerCommand::JumpChapter(direction, r)).await
    }

    pub async fn jump_to_bookmark(&self, index: usize) -> PlayerResult<f64> {
        self.request(|r| PlayerCommand::JumpBookmark(index, r)).await
    }

    pub async fn set_rate(&self, rate: f64) -> PlayerResult<f64> {
        self.request(|r| PlayerCommand::SetRate(rate, r)).await
    }

    pub async fn step_rate(&self, delta: f64) -> PlayerResult<f64> {
        self.request(|r| PlayerCommand::StepRate(delta, r)).await
    }

    pub async fn set_volume(&self, volume: i32) -> PlayerResult<u8> {
        self.request(|r| PlayerCommand::SetVolume(volume, r)).await
    }

    pub async fn step_volume(&self, delta: i32) -> PlayerResult<u8> {
        self.request(|r| PlayerCommand::StepVolume(delta, r)).await
    }

    pub async fn set_equalizer(&self, preset: impl Into<String>) -> PlayerResult<()> {
        let preset = preset.into();
        self.request(|r| PlayerCommand::SetEqualizer(preset, r)).await
    }

    pub async fn press_loop_marker(&self) -> PlayerResult<LoopPress> {
        self.request(PlayerCommand::PressLoopMarker).await
    }

    pub async fn clear_loop(&self) -> PlayerResult<()> {
        self.request(PlayerCommand::ClearLoop).await
    }

    pub async fn add_bookmark(&self, label: Option<String>) -> PlayerResult<Bookmark> {
        self.request(|r| PlayerCommand::AddBookmark(label, r)).await
    }

    /// Replaces any pending sleep timer
    pub async fn start_sleep_timer(&self, duration: Duration, action: TimerAction) -> PlayerResult<()> {
        self.request(|r| PlayerCommand::StartSleepTimer(duration, action, r))
            .await
    }

    pub async fn cancel_sleep_timer(&self) -> PlayerResult<bool> {
        self.request(PlayerCommand::CancelSleepTimer).await
    }

    /// Starts a background rescan. Returns false if one is already running.
    pub async fn rescan(&self) -> PlayerResult<bool> {
        self.request(PlayerCommand::Rescan).await
    }

    /// Runs `f` against the library inside the player task.
    ///
    /// Events the library records are dispatched and the catalog is saved
    /// afterwards.
    pub async fn with_library<R, F>(&self, f: F) -> PlayerResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut LibraryManager) -> R + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job = Box::new(move |library: &mut LibraryManager| {
            let _ = reply.send(f(library));
        });
        self.tx
            .send(PlayerCommand::Library(job))
            .await
            .map_err(|_| PlayerError::Stopped)?;
        rx.await.map_err(|_| PlayerError::Stopped)
    }

    pub async fn snapshot(&self) -> PlayerResult<PlayerSnapshot> {
        self.request(PlayerCommand::Snapshot).await
    }

    /// Flushes and stops the player task
    pub async fn shutdown(&self) -> PlayerResult<CloseReport> {
        self.request(PlayerCommand::Shutdown).await
    }
}
