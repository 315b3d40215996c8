//! Book and chapter domain models

use crate::types::{Timestamp, Validator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable identifier for a book, derived from its media root path
///
/// The key is the lowercase hex MD5 of the absolute root path string, so the
/// same directory or file always maps to the same key across rescans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookKey(String);

impl BookKey {
    /// Derives the key for a media root
    pub fn from_root(root: &Path) -> Self {
        let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let digest = md5::compute(absolute.to_string_lossy().as_bytes());
        Self(format!("{:x}", digest))
    }

    /// Wraps an already-derived key string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a book is a directory of files or a single media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookKind {
    Directory,
    SingleFile,
}

/// Everything the state store needs to find a book's sidecar record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookLocator {
    pub key: BookKey,
    pub root: PathBuf,
    pub kind: BookKind,
}

/// One audio file of a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    /// Duration in seconds, `None` until probed or reported by the transport
    pub duration: Option<f64>,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, duration: Option<f64>) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// A chapter boundary on the book's global timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// Offset in seconds from the start of the book
    pub start: f64,
}

impl Chapter {
    pub fn new(title: impl Into<String>, start: f64) -> Self {
        Self {
            title: title.into(),
            start,
        }
    }
}

/// Represents a complete audiobook in the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub key: BookKey,
    pub title: String,
    pub root: PathBuf,
    pub kind: BookKind,
    pub files: Vec<MediaFile>,
    pub chapters: Vec<Chapter>,
    pub shelves: BTreeSet<String>,
    pub pinned: bool,
    pub pin_order: Option<u32>,
    pub finished: bool,
    pub last_played: Option<Timestamp>,
    pub added_at: Timestamp,
}

impl Book {
    /// Creates a new book with required fields
    pub fn new(title: String, root: PathBuf, kind: BookKind, files: Vec<MediaFile>) -> Self {
        Self {
            key: BookKey::from_root(&root),
            title,
            root,
            kind,
            files,
            chapters: Vec::new(),
            shelves: BTreeSet::new(),
            pinned: false,
            pin_order: None,
            finished: false,
            last_played: None,
            added_at: Timestamp::now(),
        }
    }

    /// Sets chapter boundaries, keeping them sorted by start offset
    pub fn with_chapters(mut self, mut chapters: Vec<Chapter>) -> Self {
        chapters.sort_by(|a, b| a.start.total_cmp(&b.start));
        self.chapters = chapters;
        self
    }

    pub fn locator(&self) -> BookLocator {
        BookLocator {
            key: self.key.clone(),
            root: self.root.clone(),
            kind: self.kind,
        }
    }

    pub fn is_multi_file(&self) -> bool {
        self.files.len() > 1
    }

    /// Total duration, known only when every file has been probed
    pub fn total_duration(&self) -> Option<f64> {
        self.files
            .iter()
            .map(|f| f.duration)
            .try_fold(0.0, |acc, d| d.map(|d| acc + d))
    }

    pub fn has_played(&self) -> bool {
        self.last_played.is_some()
    }

    pub fn is_on_shelf(&self, name: &str) -> bool {
        self.shelves.contains(name)
    }
}

impl Validator for Book {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }

        if self.files.is_empty() {
            errors.push("Book must contain at least one media file".to_string());
        }

        if self.files.iter().any(|f| f.duration.is_some_and(|d| d < 0.0)) {
            errors.push("File durations cannot be negative".to_string());
        }

        if self.pinned != self.pin_order.is_some() {
            errors.push("Pinned books must have a pin order".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> Book {
        Book::new(
            "Moby Dick".to_string(),
            PathBuf::from("/books/moby"),
            BookKind::Directory,
            vec![
                MediaFile::new("/books/moby/01.mp3", Some(600.0)),
                MediaFile::new("/books/moby/02.mp3", Some(900.0)),
            ],
        )
    }

    #[test]
    fn test_key_is_stable_md5_hex() {
        let a = BookKey::from_root(Path::new("/books/moby"));
        let b = BookKey::from_root(Path::new("/books/moby"));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, BookKey::from_root(Path::new("/books/other")));
    }

    #[test]
    fn test_total_duration_requires_every_file() {
        let mut book = sample_book();
        assert_eq!(book.total_duration(), Some(1500.0));
        book.files[1].duration = None;
        assert_eq!(book.total_duration(), None);
    }

    #[test]
    fn test_chapters_are_sorted() {
        let book = sample_book().with_chapters(vec![
            Chapter::new("Two", 600.0),
            Chapter::new("One", 0.0),
        ]);
        assert_eq!(book.chapters[0].title, "One");
        assert_eq!(book.chapters[1].start, 600.0);
    }

    #[test]
    fn test_validation() {
        let mut book = sample_book();
        assert!(book.is_valid());
        book.title = "  ".to_string();
        book.pinned = true;
        let errors = book.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_locator_carries_kind() {
        let book = sample_book();
        let locator = book.locator();
        assert_eq!(locator.key, book.key);
        assert_eq!(locator.kind, BookKind::Directory);
        assert!(book.is_multi_file());
    }
}
