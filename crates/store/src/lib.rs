//! Durable per-book session state
//!
//! `StateStore` is the seam the player saves through. `SidecarStore` keeps
//! one JSON record beside each book's media and replaces it atomically, so a
//! crash mid-write leaves the previous record readable.

pub mod atomic;
pub mod error;
pub mod memory;
pub mod sidecar;

pub use atomic::write_atomic;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sidecar::{sidecar_path, SidecarStore, RECORD_FORMAT, SIDECAR_NAME, SIDECAR_SUFFIX};

use lectern_core::{BookLocator, SessionState};

/// Loads and saves the session record of a book
pub trait StateStore: Send + Sync {
    /// Reads a record. `Ok(None)` when there is none or it is unreadable.
    fn load(&self, locator: &BookLocator) -> StoreResult<Option<SessionState>>;

    /// Durably replaces a record
    fn save(&self, locator: &BookLocator, state: &SessionState) -> StoreResult<()>;

    /// Reads a record, falling back to fresh state at `default_volume`
    fn load_or_default(&self, locator: &BookLocator, default_volume: u8) -> SessionState {
        match self.load(locator) {
            Ok(Some(state)) => state,
            Ok(None) => SessionState::new(default_volume),
            Err(e) => {
                log::warn!("Failed to load session for {}: {}", locator.key, e);
                SessionState::new(default_volume)
            }
        }
    }
}
