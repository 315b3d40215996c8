//! The audio transport seam
//!
//! Decoding and output live outside this crate. A `Transport` is driven one
//! file at a time: positions it reports are offsets within the open file.
//! End-of-media and decode failures arrive asynchronously as
//! [`TransportEvent`]s on a channel owned by whoever built the transport.

use crate::error::{TransportError, TransportResult};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Low-level player for a single media file
pub trait Transport: Send {
    fn open(&mut self, path: &Path) -> TransportResult<()>;
    fn play(&mut self) -> TransportResult<()>;
    fn pause(&mut self) -> TransportResult<()>;
    fn seek(&mut self, secs: f64) -> TransportResult<()>;
    fn set_rate(&mut self, rate: f64) -> TransportResult<()>;
    /// Volume in percent, 0..=100
    fn set_volume(&mut self, volume: u8) -> TransportResult<()>;
    /// Offset in seconds within the open file
    fn position(&mut self) -> TransportResult<f64>;

    /// Duration of the open file, when the transport knows it
    fn duration(&mut self) -> Option<f64> {
        None
    }

    fn set_equalizer(&mut self, _preset: &str) -> TransportResult<()> {
        Ok(())
    }
}

/// Asynchronous notifications from a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The open file played to its end
    Ended,
    /// Playback broke; the message is shown to the user
    Error(String),
}

/// Commands sent to the transport thread
#[derive(Debug, Clone)]
enum TransportCommand {
    Open(PathBuf),
    Play,
    Pause,
    Seek(f64),
    SetRate(f64),
    SetVolume(u8),
    SetEqualizer(String),
    Position,
    Duration,
    Shutdown,
}

#[derive(Debug)]
enum Reply {
    Done(TransportResult<()>),
    Position(TransportResult<f64>),
    Duration(Option<f64>),
}

type Request = (TransportCommand, Sender<Reply>);

/// Runs a transport on its own thread and bounds every call by a timeout.
///
/// A transport that stops answering yields [`TransportError::TimedOut`]
/// instead of blocking the caller.
pub struct GuardedTransport {
    command_tx: Sender<Request>,
    handle: Option<thread::JoinHandle<()>>,
    timeout: Duration,
}

impl GuardedTransport {
    pub fn spawn(transport: Box<dyn Transport>, timeout: Duration) -> Self {
        let (command_tx, command_rx) = bounded::<Request>(16);

        let handle = thread::Builder::new()
            .name("lectern-transport".to_string())
            .spawn(move || transport_loop(transport, command_rx))
            .map_err(|e| log::error!("Failed to start transport thread: {}", e))
            .ok();

        Self {
            command_tx,
            handle,
            timeout,
        }
    }

    fn request(&self, command: TransportCommand) -> TransportResult<Reply> {
        let (reply_tx, reply_rx) = bounded(1);
        match self.command_tx.send_timeout((command, reply_tx), self.timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => return Err(TransportError::TimedOut(self.timeout)),
            Err(SendTimeoutError::Disconnected(_)) => return Err(TransportError::Disconnected),
        }
        match reply_rx.recv_timeout(self.timeout) {
            Ok(reply) => Ok(reply),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Transport call timed out after {:?}", self.timeout);
                Err(TransportError::TimedOut(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    fn unit(&self, command: TransportCommand) -> TransportResult<()> {
        match self.request(command)? {
            Reply::Done(result) => result,
            other => Err(TransportError::Failed(format!("unexpected reply {:?}", other))),
        }
    }
}

impl Transport for GuardedTransport {
    fn open(&mut self, path: &Path) -> TransportResult<()> {
        self.unit(TransportCommand::Open(path.to_path_buf()))
    }

    fn play(&mut self) -> TransportResult<()> {
        self.unit(TransportCommand::Play)
    }

    fn pause(&mut self) -> TransportResult<()> {
        self.unit(TransportCommand::Pause)
    }

    fn seek(&mut self, secs: f64) -> TransportResult<()> {
        self.unit(TransportCommand::Seek(secs))
    }

    fn set_rate(&mut self, rate: f64) -> TransportResult<()> {
        self.unit(TransportCommand::SetRate(rate))
    }

    fn set_volume(&mut self, volume: u8) -> TransportResult<()> {
        self.unit(TransportCommand::SetVolume(volume))
    }

    fn set_equalizer(&mut self, preset: &str) -> TransportResult<()> {
        self.unit(TransportCommand::SetEqualizer(preset.to_string()))
    }

    fn position(&mut self) -> TransportResult<f64> {
        match self.request(TransportCommand::Position)? {
            Reply::Position(result) => result,
            other => Err(TransportError::Failed(format!("unexpected reply {:?}", other))),
        }
    }

    fn duration(&mut self) -> Option<f64> {
        match self.request(TransportCommand::Duration) {
            Ok(Reply::Duration(duration)) => duration,
            _ => None,
        }
    }
}

impl Drop for GuardedTransport {
    fn drop(&mut self) {
        let (reply_tx, _reply_rx) = bounded(1);
        let _ = self
            .command_tx
            .try_send((TransportCommand::Shutdown, reply_tx));
        // A transport stuck inside a call is left detached
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

fn transport_loop(mut transport: Box<dyn Transport>, command_rx: Receiver<Request>) {
    for (command, reply_tx) in command_rx.iter() {
        let reply = match command {
            TransportCommand::Open(path) => Reply::Done(transport.open(&path)),
            TransportCommand::Play => Reply::Done(transport.play()),
            TransportCommand::Pause => Reply::Done(transport.pause()),
            TransportCommand::Seek(secs) => Reply::Done(transport.seek(secs)),
            TransportCommand::SetRate(rate) => Reply::Done(transport.set_rate(rate)),
            TransportCommand::SetVolume(volume) => Reply::Done(transport.set_volume(volume)),
            TransportCommand::SetEqualizer(preset) => {
                Reply::Done(transport.set_equalizer(&preset))
            }
            TransportCommand::Position => Reply::Position(transport.position()),
            TransportCommand::Duration => Reply::Duration(transport.duration()),
            TransportCommand::Shutdown => break,
        };
        // The caller may have timed out and gone away
        let _ = reply_tx.send(reply);
    }
    log::debug!("Transport thread finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
        hang_on_seek: bool,
    }

    impl Transport for Recorder {
        fn open(&mut self, path: &Path) -> TransportResult<()> {
            if path.to_string_lossy().contains("missing") {
                return Err(TransportError::Failed("no such file".to_string()));
            }
            self.calls.lock().unwrap().push(format!("open {}", path.display()));
            Ok(())
        }
        fn play(&mut self) -> TransportResult<()> {
            self.calls.lock().unwrap().push("play".to_string());
            Ok(())
        }
        fn pause(&mut self) -> TransportResult<()> {
            Ok(())
        }
        fn seek(&mut self, secs: f64) -> TransportResult<()> {
            if self.hang_on_seek {
                thread::sleep(Duration::from_millis(500));
            }
            self.calls.lock().unwrap().push(format!("seek {}", secs));
            Ok(())
        }
        fn set_rate(&mut self, _rate: f64) -> TransportResult<()> {
            Ok(())
        }
        fn set_volume(&mut self, _volume: u8) -> TransportResult<()> {
            Ok(())
        }
        fn position(&mut self) -> TransportResult<f64> {
            Ok(12.5)
        }
        fn duration(&mut self) -> Option<f64> {
            Some(60.0)
        }
    }

    #[test]
    fn test_guarded_transport_forwards_calls() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut guarded = GuardedTransport::spawn(
            Box::new(Recorder {
                calls: Arc::clone(&calls),
                hang_on_seek: false,
            }),
            Duration::from_secs(2),
        );

        guarded.open(Path::new("/b/1.mp3")).unwrap();
        guarded.seek(3.0).unwrap();
        guarded.play().unwrap();
        assert_eq!(guarded.position().unwrap(), 12.5);
        assert_eq!(guarded.duration(), Some(60.0));
        assert!(guarded.open(Path::new("/b/missing.mp3")).is_err());

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["open /b/1.mp3", "seek 3", "play"]
        );
    }

    #[test]
    fn test_stuck_transport_times_out() {
        let mut guarded = GuardedTransport::spawn(
            Box::new(Recorder {
                hang_on_seek: true,
                ..Recorder::default()
            }),
            Duration::from_millis(50),
        );

        assert_eq!(
            guarded.seek(1.0),
            Err(TransportError::TimedOut(Duration::from_millis(50)))
        );
    }
}
