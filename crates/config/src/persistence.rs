//! File system persistence for configuration
//!
//! Writes go through a temp file in the same directory and an atomic rename,
//! after copying the previous file to `config.toml.backup`.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Handles configuration file persistence
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    /// Creates a new persistence handler for the given config file path
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads configuration from file
    ///
    /// If the file doesn't exist, returns the default config.
    /// If the file is empty or corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents =
            fs::read_to_string(&self.config_path).map_err(|e| ConfigError::Read {
                path: self.config_path.clone(),
                source: e,
            })?;

        // An empty file is corrupt, not a request for defaults
        if contents.trim().is_empty() {
            return Err(ConfigError::Empty {
                path: self.config_path.clone(),
            });
        }

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: self.config_path.clone(),
                source: e,
            })?;

        if config.version > CONFIG_VERSION {
            log::warn!(
                "Config version {} is newer than supported version {}, reading what is understood",
                config.version,
                CONFIG_VERSION
            );
        }

        // Validate the loaded config
        if let Err(errors) = config.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            // Warn only, so a hand-edited file is not thrown away
            log::warn!("Config validation warnings: {}", error_msg);
        }

        Ok(config)
    }

    /// Saves configuration to file atomically
    ///
    /// This uses a temporary file and atomic rename to ensure the config
    /// file is never left in a corrupted state.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        // Validate before saving
        config.validate().map_err(ConfigError::Invalid)?;

        if let Some(parent) = self.config_path.parent() {
            self.ensure_directory_exists(parent)?;
        }

        // Backup existing config if it exists
        if self.config_path.exists() {
            self.backup_config()?;
        }

        let toml_string = toml::to_string_pretty(config)?;

        let temp_file = self.create_temp_file()?;
        self.write_atomic(temp_file, &toml_string)?;

        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensures a directory exists, creating it if necessary
    fn ensure_directory_exists(&self, path: &Path) -> ConfigResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| ConfigError::CreateDir {
                path: path.to_path_buf(),
                source: e,
            })?;
            log::info!("Created config directory: {}", path.display());
        }
        Ok(())
    }

    /// Creates a backup of the current config file
    fn backup_config(&self) -> ConfigResult<()> {
        let backup_path = self.config_path.with_extension("toml.backup");
        fs::copy(&self.config_path, &backup_path).map_err(|e| ConfigError::Backup {
            path: backup_path.clone(),
            source: e,
        })?;
        log::debug!("Backed up config to {}", backup_path.display());
        Ok(())
    }

    /// Creates a temporary file in the same directory as the config file
    fn create_temp_file(&self) -> ConfigResult<NamedTempFile> {
        let dir = self
            .config_path
            .parent()
            .ok_or_else(|| {
                ConfigError::NoLocation("config path has no parent directory".to_string())
            })?;

        NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))
    }

    /// Writes content to a temporary file and atomically renames it
    fn write_atomic(&self, mut temp_file: NamedTempFile, content: &str) -> ConfigResult<()> {
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| self.write_error(e))?;

        temp_file.flush().map_err(|e| self.write_error(e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| self.write_error(e))?;

        temp_file
            .persist(&self.config_path)
            .map_err(|e| self.write_error(e.error))?;

        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Write {
            path: self.config_path.clone(),
            source,
        }
    }

    /// Writes a default config file
    pub fn generate_default(&self) -> ConfigResult<()> {
        self.save(&Config::default())?;

        log::info!("Generated default config at {}", self.config_path.display());
        Ok(())
    }
}
