//! Serial state writes
//!
//! Every write the player makes goes through one queue and runs on the
//! blocking pool one after another. A write therefore always lands after
//! the writes queued before it: a slow periodic save can never overwrite
//! the final state flushed at close.

use lectern_core::{BookKey, BookLocator, SessionState};
use lectern_store::StateStore;
use log::debug;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub(crate) type WriteResult = Result<(), String>;

/// Who hears back about a write
pub(crate) enum Reply {
    /// A clock save; the outcome goes back to the player loop with its ticket
    Ticket(u64),
    /// The final write at close, awaited by the closer
    Flush(oneshot::Sender<WriteResult>),
}

pub(crate) struct SaveJob {
    pub locator: BookLocator,
    pub state: SessionState,
    pub reply: Reply,
}

pub(crate) struct SaveOutcome {
    pub key: BookKey,
    pub ticket: u64,
    pub result: WriteResult,
}

/// Runs until every job sender is gone, then drains what is left
pub(crate) async fn write_in_order(
    store: Arc<dyn StateStore>,
    mut jobs: mpsc::UnboundedReceiver<SaveJob>,
    outcomes: mpsc::UnboundedSender<SaveOutcome>,
) {
    while let Some(SaveJob {
        locator,
        state,
        reply,
    }) = jobs.recv().await
    {
        let key = locator.key.clone();
        let store = Arc::clone(&store);
        let result = tokio::task::spawn_blocking(move || store.save(&locator, &state))
            .await
            .map_err(|e| format!("save task failed: {}", e))
            .and_then(|saved| saved.map_err(|e| e.to_string()));

        match reply {
            Reply::Ticket(ticket) => {
                let outcome = SaveOutcome {
                    key,
                    ticket,
                    result,
                };
                if outcomes.send(outcome).is_err() {
                    debug!("Save {} finished after the player stopped", ticket);
                }
            }
            Reply::Flush(done) => {
                if done.send(result).is_err() {
                    debug!("Flush for {} finished after its deadline", key);
                }
            }
        }
    }
    debug!("State writer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_store::MemoryStore;
    use std::path::PathBuf;

    fn locator() -> BookLocator {
        BookLocator {
            key: BookKey::from_string("emma"),
            root: PathBuf::from("/b/emma.mp3"),
            kind: lectern_core::BookKind::SingleFile,
        }
    }

    fn at(position: f64) -> SessionState {
        let mut state = SessionState::new(100);
        state.position = position;
        state
    }

    #[tokio::test]
    async fn test_writes_land_in_queue_order() {
        let store = Arc::new(MemoryStore::new());
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, mut outcomes_rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_in_order(store.clone(), jobs_rx, outcomes_tx));

        let (done_tx, done_rx) = oneshot::channel();
        for (position, reply) in [
            (100.0, Reply::Ticket(1)),
            (200.0, Reply::Ticket(2)),
            (2000.0, Reply::Flush(done_tx)),
        ] {
            let job = SaveJob {
                locator: locator(),
                state: at(position),
                reply,
            };
            assert!(jobs_tx.send(job).is_ok());
        }

        assert_eq!(done_rx.await, Ok(Ok(())));
        assert_eq!(outcomes_rx.recv().await.map(|o| o.ticket), Some(1));
        assert_eq!(outcomes_rx.recv().await.map(|o| o.ticket), Some(2));
        assert_eq!(store.get(&locator().key).map(|s| s.position), Some(2000.0));

        drop(jobs_tx);
        assert!(writer.await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_write_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, mut outcomes_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_in_order(store, jobs_rx, outcomes_tx));

        let job = SaveJob {
            locator: locator(),
            state: at(5.0),
            reply: Reply::Ticket(7),
        };
        assert!(jobs_tx.send(job).is_ok());

        let outcome = outcomes_rx.recv().await.unwrap();
        assert_eq!(outcome.ticket, 7);
        assert!(outcome.result.is_err());
    }
}
