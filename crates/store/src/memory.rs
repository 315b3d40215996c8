//! In-process `StateStore`, used where no media directory is writable

use crate::{StateStore, StoreError, StoreResult};
use lectern_core::{BookKey, BookLocator, SessionState};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<BookKey, SessionState>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record
    pub fn insert(&self, key: BookKey, state: SessionState) {
        self.lock().insert(key, state);
    }

    pub fn get(&self, key: &BookKey) -> Option<SessionState> {
        self.lock().get(key).cloned()
    }

    /// Makes every following save fail with a write error until reset
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BookKey, SessionState>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn load(&self, locator: &BookLocator) -> StoreResult<Option<SessionState>> {
        Ok(self.get(&locator.key))
    }

    fn save(&self, locator: &BookLocator, state: &SessionState) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                path: locator.root.clone(),
                source: io::Error::other("saves disabled"),
            });
        }
        self.lock().insert(locator.key.clone(), state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
