//! Configuration manager - main API for config operations
//!
//! Also resolves where Lectern keeps its data. Three sources are tried in
//! order: `app.data_dir` from the config, a `lectern.portable` marker file
//! next to the executable (portable mode, everything lives beside the
//! binary), and finally the platform data directory.

use crate::persistence::ConfigPersistence;
use crate::{AppConfig, Config, ConfigError, ConfigResult};
use crate::app_config::LogLevel;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// File that switches Lectern into portable mode when placed next to the executable
pub const PORTABLE_MARKER: &str = "lectern.portable";

/// Directory created beside the executable in portable mode
pub const PORTABLE_DATA_DIR: &str = "lectern-data";

const CONFIG_FILE: &str = "config.toml";

/// Main configuration manager
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
    default_data_dir: PathBuf,
    portable: bool,
}

impl ConfigManager {
    /// Creates a config manager for this installation
    ///
    /// Portable installs keep config and data together beside the executable;
    /// otherwise the platform directories are used:
    /// - Linux: `~/.config/lectern/` and `~/.local/share/lectern/`
    /// - macOS: `~/Library/Application Support/lectern/`
    /// - Windows: `%APPDATA%\lectern\`
    pub fn new() -> ConfigResult<Self> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        if let Some(root) = exe_dir.as_deref().and_then(portable_root) {
            log::info!("Portable mode: data lives in {}", root.display());
            let mut manager = Self::with_directory(root)?;
            manager.portable = true;
            return Ok(manager);
        }

        let dirs = project_dirs()?;
        let mut manager = Self::with_directory(dirs.config_dir().to_path_buf())?;
        manager.default_data_dir = dirs.data_dir().to_path_buf();
        Ok(manager)
    }

    /// Creates a config manager with a custom config directory
    ///
    /// The directory doubles as the default data directory.
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let persistence = ConfigPersistence::new(config_dir.join(CONFIG_FILE));

        Ok(Self {
            persistence,
            default_data_dir: config_dir.clone(),
            config_dir,
            portable: false,
        })
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn is_portable(&self) -> bool {
        self.portable
    }

    /// Directory for the library catalog and other process-local data
    pub fn data_dir(&self, app: &AppConfig) -> PathBuf {
        match &app.data_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.config_dir.join(dir),
            None => self.default_data_dir.clone(),
        }
    }

    /// Like `data_dir`, creating the directory if needed
    pub fn ensure_data_dir(&self, app: &AppConfig) -> ConfigResult<PathBuf> {
        let dir = self.data_dir(app);
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir)
    }

    /// Loads the configuration from file
    ///
    /// A missing file yields defaults; a corrupt one is an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Validates and atomically saves the configuration
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads, applies `update_fn`, and saves the result
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if none exists
    ///
    /// Returns Ok(true) if a new file was created.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.persistence.generate_default()?;
        Ok(true)
    }

    /// Overwrites the config file with defaults
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies `LECTERN_SECTION_FIELD` environment overrides
    ///
    /// Recognized: `LECTERN_APP_LOG_LEVEL`, `LECTERN_APP_DATA_DIR`,
    /// `LECTERN_PLAYER_DEFAULT_VOLUME`, `LECTERN_PLAYER_TICK_INTERVAL_MS`.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("", "", "lectern")
        .ok_or_else(|| ConfigError::NoLocation("no home directory for this user".to_string()))
}

/// Portable data root for an executable directory, if the marker is present
pub fn portable_root(exe_dir: &Path) -> Option<PathBuf> {
    if exe_dir.join(PORTABLE_MARKER).is_file() {
        Some(exe_dir.join(PORTABLE_DATA_DIR))
    } else {
        None
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(level) = var("LECTERN_APP_LOG_LEVEL") {
        match parse_log_level(&level) {
            Some(level) => config.app.log_level = level,
            None => log::warn!("Ignoring unknown log level override '{}'", level),
        }
    }

    if let Some(dir) = var("LECTERN_APP_DATA_DIR") {
        config.app.data_dir = Some(PathBuf::from(dir));
    }

    if let Some(v) = var("LECTERN_PLAYER_DEFAULT_VOLUME").and_then(|v| v.parse::<u8>().ok()) {
        config.player.default_volume = v;
    }

    if let Some(ms) = var("LECTERN_PLAYER_TICK_INTERVAL_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.player.tick_interval_ms = ms;
    }
}

fn parse_log_level(s: &str) -> Option<LogLevel> {
    match s.trim().to_ascii_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}
