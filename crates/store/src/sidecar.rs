//! Session records stored next to the media they describe
//!
//! A directory book keeps its record at `<dir>/.lectern-session.json`; a
//! single-file book at `<file>.lectern-session.json`. Moving or copying the
//! media together with its record keeps the listening state.

use crate::atomic::write_atomic;
use crate::{StateStore, StoreError, StoreResult};
use lectern_core::{BookKind, BookLocator, SessionState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Record file name inside a directory book
pub const SIDECAR_NAME: &str = ".lectern-session.json";

/// Suffix appended to a single-file book's file name
pub const SIDECAR_SUFFIX: &str = ".lectern-session.json";

/// Suffix of the copy kept when a corrupt record is replaced
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// Current record layout version
pub const RECORD_FORMAT: u32 = 1;

#[derive(Deserialize)]
struct StoredRecord {
    #[serde(default = "default_format")]
    format: u32,
    #[serde(flatten)]
    state: SessionState,
}

#[derive(Serialize)]
struct RecordOut<'a> {
    format: u32,
    #[serde(flatten)]
    state: &'a SessionState,
}

fn default_format() -> u32 {
    RECORD_FORMAT
}

/// Where the record for a book lives
pub fn sidecar_path(locator: &BookLocator) -> PathBuf {
    match locator.kind {
        BookKind::Directory => locator.root.join(SIDECAR_NAME),
        BookKind::SingleFile => {
            let mut name: OsString = locator.root.as_os_str().to_owned();
            name.push(SIDECAR_SUFFIX);
            PathBuf::from(name)
        }
    }
}

fn corrupt_copy_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(CORRUPT_SUFFIX);
    PathBuf::from(name)
}

/// Parses record bytes. `None` means the record is unusable.
fn decode(path: &Path, bytes: &[u8]) -> Option<SessionState> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        log::warn!("Session record at {} is empty", path.display());
        return None;
    }

    match serde_json::from_slice::<StoredRecord>(bytes) {
        Ok(record) => {
            if record.format > RECORD_FORMAT {
                log::warn!(
                    "Session record at {} has format {} (newer than {}), reading known fields",
                    path.display(),
                    record.format,
                    RECORD_FORMAT
                );
            }
            let mut state = record.state;
            state.sanitize(None);
            Some(state)
        }
        Err(e) => {
            log::warn!("Corrupt session record at {}: {}", path.display(), e);
            None
        }
    }
}

/// `StateStore` backed by JSON sidecar files
#[derive(Debug, Default)]
pub struct SidecarStore {
    /// Records found corrupt on load; backed up before their next overwrite
    corrupt: Mutex<HashSet<PathBuf>>,
}

impl SidecarStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember_corrupt(&self, path: &Path) {
        let mut corrupt = self.corrupt.lock().unwrap_or_else(|e| e.into_inner());
        corrupt.insert(path.to_path_buf());
    }

    fn take_corrupt(&self, path: &Path) -> bool {
        let mut corrupt = self.corrupt.lock().unwrap_or_else(|e| e.into_inner());
        corrupt.remove(path)
    }

    fn backup_corrupt(&self, path: &Path) {
        if !self.take_corrupt(path) {
            return;
        }
        let backup = corrupt_copy_path(path);
        match fs::copy(path, &backup) {
            Ok(_) => log::info!(
                "Kept unreadable session record as {}",
                backup.display()
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Could not keep a copy of corrupt record {}: {}",
                path.display(),
                e
            ),
        }
    }
}

impl StateStore for SidecarStore {
    fn load(&self, locator: &BookLocator) -> StoreResult<Option<SessionState>> {
        let path = sidecar_path(locator);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Read { path, source: e }),
        };

        match decode(&path, &bytes) {
            Some(state) => Ok(Some(state)),
            None => {
                self.remember_corrupt(&path);
                Ok(None)
            }
        }
    }

    fn save(&self, locator: &BookLocator, state: &SessionState) -> StoreResult<()> {
        let path = sidecar_path(locator);
        let record = RecordOut {
            format: RECORD_FORMAT,
            state,
        };
        let bytes = serde_json::to_vec_pretty(&record)?;

        self.backup_corrupt(&path);

        write_atomic(&path, &bytes).map_err(|e| StoreError::Write {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("Saved session for {} to {}", locator.key, path.display());
        Ok(())
    }
}
