//! Finds books under the library roots
//!
//! Inside a root, every media file sitting directly in the root is a
//! single-file book, and every immediate subdirectory holding media (at any
//! depth below it) is one multi-file book. Files of a multi-file book are
//! kept in natural order, so "2.mp3" plays before "10.mp3".

use lectern_config::LibraryConfig;
use lectern_core::BookKind;
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scanning rules
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Maximum depth below a book directory (None = unlimited)
    pub max_depth: Option<usize>,
    /// Files smaller than this are ignored
    pub min_file_size: u64,
    pub follow_symlinks: bool,
    /// Lowercase extensions without the dot
    pub supported_extensions: HashSet<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from(&LibraryConfig::default())
    }
}

impl From<&LibraryConfig> for ScannerConfig {
    fn from(config: &LibraryConfig) -> Self {
        Self {
            max_depth: match config.max_scan_depth {
                0 => None,
                depth => Some(depth as usize),
            },
            min_file_size: config.min_file_size_bytes,
            follow_symlinks: config.follow_symlinks,
            supported_extensions: config
                .supported_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }
}

impl ScannerConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_file_size(mut self, size: u64) -> Self {
        self.min_file_size = size;
        self
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// A book found on disk, before metadata probing
#[derive(Debug, Clone, PartialEq)]
pub struct BookCandidate {
    pub root: PathBuf,
    pub kind: BookKind,
    /// Folder name or file stem
    pub title: String,
    /// Media files in playback order
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LibraryScanner {
    config: ScannerConfig,
}

impl LibraryScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Walks every root and returns the books found, in natural path order.
    ///
    /// Missing roots are logged and skipped; a root listed twice is scanned once.
    pub fn scan(&self, roots: &[PathBuf]) -> Vec<BookCandidate> {
        info!("Starting library scan of {} roots", roots.len());

        let mut candidates = Vec::new();
        let mut scanned = HashSet::new();

        for root in roots {
            if !root.exists() {
                warn!("Library root does not exist: {}", root.display());
                continue;
            }

            let canonical = root.canonicalize().unwrap_or_else(|_| root.clone());
            if !scanned.insert(canonical) {
                debug!("Skipping already scanned root: {}", root.display());
                continue;
            }

            if root.is_file() {
                if self.is_valid_audio_file(root) {
                    candidates.push(single_file_candidate(root));
                }
                continue;
            }

            candidates.extend(self.scan_root(root));
        }

        candidates.sort_by(|a, b| natural_path_cmp(&a.root, &b.root));
        info!("Scan completed: found {} books", candidates.len());
        candidates
    }

    fn scan_root(&self, root: &Path) -> Vec<BookCandidate> {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read library root {}: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }

            let is_dir = if self.config.follow_symlinks {
                path.is_dir()
            } else {
                entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
            };

            if is_dir {
                let files = self.collect_media(&path);
                if !files.is_empty() {
                    candidates.push(BookCandidate {
                        title: file_label(&path),
                        root: path,
                        kind: BookKind::Directory,
                        files,
                    });
                }
            } else if self.is_valid_audio_file(&path) {
                candidates.push(single_file_candidate(&path));
            }
        }
        candidates
    }

    /// All media below a book directory, in natural order
    fn collect_media(&self, dir: &Path) -> Vec<PathBuf> {
        let walker = WalkDir::new(dir)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX));

        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    warn!("Error walking directory: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() || (self.config.follow_symlinks && e.path().is_file()))
            .map(|e| e.into_path())
            .filter(|p| self.is_valid_audio_file(p))
            .collect();

        files.sort_by(|a, b| natural_path_cmp(a, b));
        files
    }

    /// Extension and size check
    fn is_valid_audio_file(&self, path: &Path) -> bool {
        if is_hidden(path) {
            return false;
        }

        let has_valid_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.config.supported_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false);

        if !has_valid_extension {
            return false;
        }

        match fs::metadata(path) {
            Ok(metadata) => metadata.is_file() && metadata.len() >= self.config.min_file_size,
            Err(e) => {
                debug!("Error checking file {}: {}", path.display(), e);
                false
            }
        }
    }
}

fn single_file_candidate(path: &Path) -> BookCandidate {
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_label(path));
    BookCandidate {
        root: path.to_path_buf(),
        kind: BookKind::SingleFile,
        title,
        files: vec![path.to_path_buf()],
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Compares strings treating digit runs as numbers and letters case-insensitively
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lnum = take_digits(&mut left);
                let rnum = take_digits(&mut right);
                let ordering = compare_digit_runs(&lnum, &rnum);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
}

/// Natural order over whole paths, component by component
pub fn natural_path_cmp(a: &Path, b: &Path) -> Ordering {
    let mut left = a.components();
    let mut right = b.components();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = natural_cmp(
                    &x.as_os_str().to_string_lossy(),
                    &y.as_os_str().to_string_lossy(),
                );
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_cmp_numbers() {
        assert_eq!(natural_cmp("2.mp3", "10.mp3"), Ordering::Less);
        assert_eq!(natural_cmp("Part 10", "part 9"), Ordering::Greater);
        assert_eq!(natural_cmp("track007", "track7"), Ordering::Less);
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
    }

    #[test]
    fn test_natural_sort_of_file_list() {
        let mut names = vec!["Chapter 10.mp3", "chapter 2.mp3", "Chapter 1.mp3", "Intro.mp3"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["Chapter 1.mp3", "chapter 2.mp3", "Chapter 10.mp3", "Intro.mp3"]
        );
    }

    #[test]
    fn test_natural_path_cmp_by_component() {
        assert_eq!(
            natural_path_cmp(Path::new("/b/disc 2/1.mp3"), Path::new("/b/disc 10/1.mp3")),
            Ordering::Less
        );
    }

    #[test]
    fn test_config_from_library_config() {
        let mut library = LibraryConfig::default();
        library.max_scan_depth = 3;
        library.supported_extensions = vec![".MP3".to_string()];
        let config = ScannerConfig::from(&library);
        assert_eq!(config.max_depth, Some(3));
        assert!(config.supported_extensions.contains("mp3"));
    }
}
