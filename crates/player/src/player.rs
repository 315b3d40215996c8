//! The player task: the one place session, clock, library and store meet
//!
//! Commands, clock ticks, transport callbacks, scan results and save
//! completions are all handled on a single tokio task, one at a time. File
//! I/O (sidecar writes, scans) runs on the blocking pool and reports back
//! through channels, so a slow disk never stalls a tick. Sidecar writes
//! additionally go through one ordered queue.

use crate::command::{CloseReport, PlayerCommand, PlayerSnapshot};
use crate::error::{PlayerError, PlayerResult};
use crate::handle::PlayerHandle;
use crate::writer::{self, Reply, SaveJob, SaveOutcome};
use lectern_config::PlayerConfig;
use lectern_core::{Book, BookKey, BookLocator, Event, PlaybackStatus, SessionState, Timestamp};
use lectern_library::LibraryManager;
use lectern_playback::{
    ClockService, ClockSettings, Dispatcher, GuardedTransport, PlaybackSession, SaveRequest,
    SessionSettings, Subscriber, Transport, TransportEvent,
};
use lectern_store::StateStore;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

const COMMAND_QUEUE: usize = 64;

/// Owns the playback session and everything around it
pub struct Player {
    session: PlaybackSession,
    clock: ClockService,
    dispatcher: Dispatcher,
    library: LibraryManager,
    store: Arc<dyn StateStore>,
    default_volume: u8,
    flush_timeout: Duration,
    scanning: bool,
    commands: mpsc::Receiver<PlayerCommand>,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    scan_tx: mpsc::UnboundedSender<Vec<Book>>,
    scan_rx: mpsc::UnboundedReceiver<Vec<Book>>,
    jobs_tx: mpsc::UnboundedSender<SaveJob>,
    /// Handed to the writer task when the player starts running
    jobs_rx: Option<mpsc::UnboundedReceiver<SaveJob>>,
    save_tx: mpsc::UnboundedSender<SaveOutcome>,
    save_rx: mpsc::UnboundedReceiver<SaveOutcome>,
}

impl Player {
    /// Builds a player around `transport`, which is moved to its own thread
    /// and bounded by the configured transport timeout.
    pub fn new(
        config: &PlayerConfig,
        library: LibraryManager,
        store: Arc<dyn StateStore>,
        transport: Box<dyn Transport>,
    ) -> (Self, PlayerHandle) {
        let guarded = GuardedTransport::spawn(transport, config.transport_timeout());
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (scan_tx, scan_rx) = mpsc::unbounded_channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (save_tx, save_rx) = mpsc::unbounded_channel();

        let player = Self {
            session: PlaybackSession::new(Box::new(guarded), SessionSettings::from(config)),
            clock: ClockService::new(ClockSettings::from(config)),
            dispatcher: Dispatcher::new(),
            library,
            store,
            default_volume: config.default_volume,
            flush_timeout: config.flush_timeout(),
            scanning: false,
            commands,
            transport_tx,
            transport_rx,
            scan_tx,
            scan_rx,
            jobs_tx,
            jobs_rx: Some(jobs_rx),
            save_tx,
            save_rx,
        };
        (player, PlayerHandle::new(command_tx))
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.dispatcher.subscribe(subscriber);
    }

    /// Sender for the transport's end-of-media and error callbacks
    pub fn transport_events(&self) -> mpsc::UnboundedSender<TransportEvent> {
        self.transport_tx.clone()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until shutdown is requested or every handle is dropped
    pub async fn run(mut self) {
        let mut ticker = time::interval(self.clock.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if let Some(jobs) = self.jobs_rx.take() {
            tokio::spawn(writer::write_in_order(
                Arc::clone(&self.store),
                jobs,
                self.save_tx.clone(),
            ));
        }
        info!("Player started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                command = self.commands.recv() => match command {
                    Some(PlayerCommand::Shutdown(reply)) => {
                        let report = self.shutdown().await;
                        let _ = reply.send(Ok(report));
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(event) = self.transport_rx.recv() => self.on_transport_event(event),
                Some(books) = self.scan_rx.recv() => self.on_scan_finished(books),
                Some(outcome) = self.save_rx.recv() => self.on_save_finished(outcome),
            }
            self.flush_if_requested();
            self.publish_events();
        }
        info!("Player stopped");
    }

    fn on_tick(&mut self) {
        if let Some(request) = self.clock.tick(&mut self.session, Timestamp::now()) {
            self.queue_save(request);
        }
        self.publish_events();
        self.dispatcher.end_tick();
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        if !self.session.is_loaded() {
            debug!("Transport event with no book open: {:?}", event);
            return;
        }
        if let Err(e) = self.session.handle_transport_event(event) {
            warn!("Transport reported a failure: {}", e);
        }
    }

    /// Writes right away when the session asked for it (stop, end of book)
    fn flush_if_requested(&mut self) {
        if let Some(request) = self.clock.take_flush(&mut self.session, Timestamp::now()) {
            debug!("Immediate save for {}", request.locator.key);
            self.queue_save(request);
        }
    }

    fn queue_save(&mut self, request: SaveRequest) {
        let ticket = request.ticket;
        let job = SaveJob {
            locator: request.locator,
            state: request.state,
            reply: Reply::Ticket(ticket),
        };
        if self.jobs_tx.send(job).is_err() {
            warn!("State writer is gone, dropping save {}", ticket);
            self.clock.save_completed(ticket, false);
        }
    }

    fn on_save_finished(&mut self, outcome: SaveOutcome) {
        match outcome.result {
            Ok(()) => {
                debug!("Saved session for {}", outcome.key);
                self.clock.save_completed(outcome.ticket, true);
            }
            Err(reason) => {
                warn!("Saving session for {} failed: {}", outcome.key, reason);
                self.clock.save_completed(outcome.ticket, false);
                self.dispatcher.publish(Event::PersistenceFailed {
                    key: outcome.key,
                    reason,
                });
            }
        }
    }

    fn start_scan(&mut self) -> bool {
        if self.scanning {
            return false;
        }
        self.scanning = true;
        let job = self.library.scan_job();
        let tx = self.scan_tx.clone();
        tokio::task::spawn_blocking(move || {
            let _ = tx.send(job.run());
        });
        info!("Library scan started");
        true
    }

    fn on_scan_finished(&mut self, books: Vec<Book>) {
        self.scanning = false;
        let report = self.library.apply_scan(books);
        info!(
            "Library scan finished: {} added, {} updated",
            report.added.len(),
            report.updated.len()
        );
        if !report.added.is_empty() {
            self.library.hydrate(self.store.as_ref());
        }
        if report.has_changes() {
            self.save_catalog();
        }
    }

    fn save_catalog(&self) {
        if let Err(e) = self.library.save_catalog() {
            error!("Failed to save library catalog: {}", e);
        }
    }

    /// Routes session, clock and library events to subscribers, keeping the
    /// library's view of the open book current on the way
    fn publish_events(&mut self) {
        let now = Timestamp::now();
        for event in self.session.drain_events() {
            match &event {
                Event::StatusChanged {
                    key,
                    status: PlaybackStatus::Playing,
                } => {
                    if let Err(e) = self.library.index_mut().record_played(key, now) {
                        warn!("Could not record play of {}: {}", key, e);
                    }
                }
                Event::Finished { key } => {
                    if let Err(e) = self.library.index_mut().set_finished(key, true) {
                        warn!("Could not mark {} finished: {}", key, e);
                    }
                }
                _ => {}
            }
            self.dispatcher.publish(event);
        }
        self.dispatcher.publish_all(self.clock.drain_events());
        self.dispatcher.publish_all(self.library.drain_events());
    }

    async fn handle_command(&mut self, command: PlayerCommand) {
        let now = Timestamp::now();
        match command {
            PlayerCommand::Open(key, reply) => {
                let result = self.open(key).await;
                let _ = reply.send(result);
            }
            PlayerCommand::Close(reply) => {
                let report = self.close_current().await;
                let _ = reply.send(Ok(report));
            }
            PlayerCommand::Play(reply) => {
                let _ = reply.send(self.session.play(now).map_err(PlayerError::from));
            }
            PlayerCommand::Pause(reply) => {
                let _ = reply.send(self.session.pause(now).map_err(PlayerError::from));
            }
            PlayerCommand::Toggle(reply) => {
                let _ = reply.send(self.session.toggle(now).map_err(PlayerError::from));
            }
            PlayerCommand::Stop(reply) => {
                let _ = reply.send(self.session.stop().map_err(PlayerError::from));
            }
            PlayerCommand::SeekTo(position, reply) => {
                let _ = reply.send(self.session.seek_to(position).map_err(PlayerError::from));
            }
            PlayerCommand::SeekBy(delta, reply) => {
                let _ = reply.send(self.session.seek_by(delta).map_err(PlayerError::from));
            }
            PlayerCommand::JumpChapter(direction, reply) => {
                let result = self.session.jump_to_chapter(direction);
                let _ = reply.send(result.map_err(PlayerError::from));
            }
            PlayerCommand::JumpBookmark(index, reply) => {
                let result = self.session.jump_to_bookmark(index);
                let _ = reply.send(result.map_err(PlayerError::from));
            }
            PlayerCommand::SetRate(rate, reply) => {
                let _ = reply.send(self.session.set_rate(rate).map_err(PlayerError::from));
            }
            PlayerCommand::StepRate(delta, reply) => {
                let _ = reply.send(self.session.step_rate(delta).map_err(PlayerError::from));
            }
            PlayerCommand::SetVolume(volume, reply) => {
                let _ = reply.send(self.session.set_volume(volume).map_err(PlayerError::from));
            }
            PlayerCommand::StepVolume(delta, reply) => {
                let _ = reply.send(self.session.step_volume(delta).map_err(PlayerError::from));
            }
            PlayerCommand::SetEqualizer(preset, reply) => {
                let result = self.session.set_equalizer(&preset);
                let _ = reply.send(result.map_err(PlayerError::from));
            }
            PlayerCommand::PressLoopMarker(reply) => {
                let _ = reply.send(self.session.press_loop_marker().map_err(PlayerError::from));
            }
            PlayerCommand::ClearLoop(reply) => {
                let _ = reply.send(self.session.clear_loop().map_err(PlayerError::from));
            }
            PlayerCommand::AddBookmark(label, reply) => {
                let result = self.session.add_bookmark(label.as_deref(), now);
                let _ = reply.send(result.map_err(PlayerError::from));
            }
            PlayerCommand::StartSleepTimer(duration, action, reply) => {
                self.clock
                    .start_sleep_timer(&mut self.session, duration, action);
                let _ = reply.send(Ok(()));
            }
            PlayerCommand::CancelSleepTimer(reply) => {
                let cancelled = self.clock.cancel_sleep_timer(&mut self.session);
                let _ = reply.send(Ok(cancelled));
            }
            PlayerCommand::Rescan(reply) => {
                let started = self.start_scan();
                let _ = reply.send(Ok(started));
            }
            PlayerCommand::Library(job) => {
                job(&mut self.library);
                self.save_catalog();
            }
            PlayerCommand::Snapshot(reply) => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            PlayerCommand::Shutdown(reply) => {
                // Handled by the run loop; answer anyway if it gets here
                let report = self.shutdown().await;
                let _ = reply.send(Ok(report));
            }
        }
    }

    async fn open(&mut self, key: BookKey) -> PlayerResult<()> {
        if self.session.key() == Some(&key) {
            debug!("Book {} is already open", key);
            return Ok(());
        }
        let book = self
            .library
            .index()
            .get(&key)
            .cloned()
            .ok_or(PlayerError::BookNotFound(key))?;

        if self.session.is_loaded() {
            let report = self.close_current().await;
            if !report.is_saved() {
                warn!("Switched books with unsaved state");
            }
        }

        let store = Arc::clone(&self.store);
        let stored = load_state(store, book.locator(), self.default_volume).await;
        self.session.open(&book, stored, Timestamp::now())?;
        self.clock.track(&self.session);
        Ok(())
    }

    /// Closes the open book and writes its final state, waiting at most the
    /// flush timeout
    async fn close_current(&mut self) -> CloseReport {
        let Some((locator, state)) = self.session.close(Timestamp::now()) else {
            return CloseReport::NothingOpen;
        };
        self.clock.reset();
        self.record_progress(&locator, &state);
        self.publish_events();

        // Queued behind any write still running, so it lands last
        let (done_tx, done_rx) = oneshot::channel();
        let job = SaveJob {
            locator: locator.clone(),
            state: state.clone(),
            reply: Reply::Flush(done_tx),
        };
        let reason = if self.jobs_tx.send(job).is_err() {
            "state writer is not running".to_string()
        } else {
            match time::timeout(self.flush_timeout, done_rx).await {
                Ok(Ok(Ok(()))) => {
                    info!("Flushed session for {}", locator.key);
                    return CloseReport::Saved;
                }
                Ok(Ok(Err(e))) => e,
                Ok(Err(_)) => "state writer stopped".to_string(),
                Err(_) => format!("save did not finish within {:?}", self.flush_timeout),
            }
        };

        error!("Could not flush session for {}: {}", locator.key, reason);
        self.dispatcher.publish(Event::PersistenceFailed {
            key: locator.key.clone(),
            reason: reason.clone(),
        });
        CloseReport::Unsaved {
            locator,
            state,
            reason,
        }
    }

    fn record_progress(&mut self, locator: &BookLocator, state: &SessionState) {
        let index = self.library.index_mut();
        if state.finished {
            if let Err(e) = index.set_finished(&locator.key, true) {
                warn!("Could not mark {} finished: {}", locator.key, e);
            }
        }
        if let Some(at) = state.last_played {
            if let Err(e) = index.record_played(&locator.key, at) {
                warn!("Could not record play of {}: {}", locator.key, e);
            }
        }
    }

    async fn shutdown(&mut self) -> CloseReport {
        let report = self.close_current().await;
        self.save_catalog();
        self.publish_events();
        report
    }

    fn snapshot(&self) -> PlayerSnapshot {
        let state = self.session.state();
        PlayerSnapshot {
            status: self.session.status(),
            key: self.session.key().cloned(),
            title: self.session.book().map(|b| b.title.clone()),
            position: self.session.position(),
            duration: self.session.duration(),
            rate: state.rate,
            volume: state.volume,
            loop_range: state.loop_range,
            bookmarks: state.bookmarks.len(),
            sleep_timer: self.clock.sleep_timer_remaining(),
            scanning: self.scanning,
        }
    }
}

async fn load_state(store: Arc<dyn StateStore>, locator: BookLocator, volume: u8) -> SessionState {
    tokio::task::spawn_blocking(move || store.load_or_default(&locator, volume))
        .await
        .unwrap_or_else(|e| {
            warn!("Loading session state failed: {}", e);
            SessionState::new(volume)
        })
}
