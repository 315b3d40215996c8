//! Library scanning configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Library roots and scanning rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Root folders scanned for audiobooks
    pub library_paths: Vec<PathBuf>,

    /// Audio file extensions recognized as media (case-insensitive)
    pub supported_extensions: Vec<String>,

    /// Read titles, durations and chapters from file tags
    pub extract_metadata: bool,

    /// Maximum directory depth below a root (0 = unlimited)
    pub max_scan_depth: u32,

    /// Skip files smaller than this size in bytes
    pub min_file_size_bytes: u64,

    /// Follow symbolic links when scanning
    pub follow_symlinks: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            library_paths: Vec::new(),
            supported_extensions: vec![
                "mp3".to_string(),
                "m4a".to_string(),
                "m4b".to_string(),
                "aac".to_string(),
                "ogg".to_string(),
                "opus".to_string(),
                "flac".to_string(),
                "wav".to_string(),
                "wma".to_string(),
            ],
            extract_metadata: true,
            max_scan_depth: 0,
            min_file_size_bytes: 1024,
            follow_symlinks: false,
        }
    }
}

impl LibraryConfig {
    /// True if `ext` (without the dot) is a supported media extension
    pub fn is_supported_extension(&self, ext: &str) -> bool {
        self.supported_extensions
            .iter()
            .any(|supported| supported.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl ConfigSection for LibraryConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![Validator::in_range(
            self.min_file_size_bytes,
            0,
            100 * 1024 * 1024,
            "library.min_file_size_bytes",
        )];

        if self.supported_extensions.is_empty() {
            results.push(Err(ValidationError::new(
                "library.supported_extensions",
                "must list at least one extension",
            )));
        }

        for (i, ext) in self.supported_extensions.iter().enumerate() {
            results.push(Validator::not_empty(
                ext,
                &format!("library.supported_extensions[{}]", i),
            ));
        }

        for (i, path) in self.library_paths.iter().enumerate() {
            if path.as_os_str().is_empty() {
                results.push(Err(ValidationError::new(
                    format!("library.library_paths[{}]", i),
                    "must not be empty",
                )));
            }
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.library_paths = other.library_paths;
        self.supported_extensions = other.supported_extensions;
        self.extract_metadata = other.extract_metadata;
        self.max_scan_depth = other.max_scan_depth;
        self.min_file_size_bytes = other.min_file_size_bytes;
        self.follow_symlinks = other.follow_symlinks;
    }

    fn section_name(&self) -> &'static str {
        "library"
    }
}
