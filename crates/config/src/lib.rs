//! Lectern configuration
//!
//! Settings live in a TOML file with one table per section. Sections
//! implement `ConfigSection`, so a new feature adds its settings by adding a
//! field to `Config`.
//!
//! - Invalid or unreadable files fall back to defaults with a warning
//!   (`ConfigManager::load_or_default`)
//! - Writes are atomic and keep a `.backup` of the previous file
//! - Portable mode relocates config and data next to the executable
//!
//! ```rust,no_run
//! use lectern_config::ConfigManager;
//!
//! let manager = ConfigManager::new().expect("config directory");
//! let config = manager.load_or_default();
//! println!("Tick: {} ms", config.player.tick_interval_ms);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
mod accessibility_config;
mod app_config;
mod library_config;
mod player_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::{portable_root, ConfigManager, PORTABLE_DATA_DIR, PORTABLE_MARKER};
pub use validation::{ConfigSection, Validator};

pub use accessibility_config::{AccessibilityConfig, Verbosity};
pub use app_config::{AppConfig, LogLevel};
pub use library_config::LibraryConfig;
pub use player_config::{PlayerConfig, SleepTimerAction};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    pub app: AppConfig,

    /// Playback timing and defaults
    pub player: PlayerConfig,

    /// Library roots and scanning rules
    pub library: LibraryConfig,

    /// Screen reader announcements
    pub accessibility: AccessibilityConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates every section, returning all errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.player.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.library.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.accessibility.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.player.merge(other.player);
        self.library.merge(other.library);
        self.accessibility.merge(other.accessibility);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            player: PlayerConfig::default(),
            library: LibraryConfig::default(),
            accessibility: AccessibilityConfig::default(),
        }
    }
}
