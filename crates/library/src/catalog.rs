//! Persisted library catalog
//!
//! The catalog keeps what a rescan cannot rediscover: shelves, pins and the
//! probed file table. Listening progress stays in the per-book session
//! records, so a lost catalog is rebuilt from a rescan plus those records.

use crate::error::{LibraryError, LibraryResult};
use crate::index::LibraryIndex;
use lectern_core::Book;
use lectern_store::write_atomic;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// File name of the catalog inside the data directory
pub const CATALOG_FILE: &str = "library.json";

pub const CATALOG_FORMAT: u32 = 1;

fn default_format() -> u32 {
    CATALOG_FORMAT
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_format")]
    pub format: u32,
    #[serde(default)]
    pub shelves: Vec<String>,
    #[serde(default)]
    pub books: Vec<Book>,
}

impl Catalog {
    pub fn from_index(index: &LibraryIndex) -> Self {
        Self {
            format: CATALOG_FORMAT,
            shelves: index.shelves().map(str::to_string).collect(),
            books: index.books().cloned().collect(),
        }
    }

    pub fn into_index(self) -> LibraryIndex {
        LibraryIndex::from_parts(self.books, self.shelves)
    }

    /// Reads the catalog. A missing or unreadable file yields an empty one.
    pub fn load(path: &Path) -> Self {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No catalog at {}, starting empty", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Cannot read catalog {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_slice::<Catalog>(&bytes) {
            Ok(catalog) => {
                if catalog.format > CATALOG_FORMAT {
                    warn!(
                        "Catalog {} has format {} (newer than {})",
                        path.display(),
                        catalog.format,
                        CATALOG_FORMAT
                    );
                }
                debug!("Loaded catalog with {} books", catalog.books.len());
                catalog
            }
            Err(e) => {
                warn!("Corrupt catalog at {}, starting empty: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> LibraryResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LibraryError::CatalogWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        write_atomic(path, &bytes).map_err(|e| LibraryError::CatalogWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Saved catalog with {} books to {}", self.books.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::{BookKind, MediaFile, Shelf};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_index() -> LibraryIndex {
        let mut index = LibraryIndex::new();
        let book = Book::new(
            "Emma".to_string(),
            PathBuf::from("/library/Emma"),
            BookKind::Directory,
            vec![MediaFile::new("/library/Emma/1.mp3", Some(12.5))],
        );
        let key = book.key.clone();
        index.merge(vec![book]);
        index.assign_shelf(&key, &Shelf::user("Classics")).unwrap();
        index.create_shelf("Empty").unwrap();
        index.pin(&key).unwrap();
        index
    }

    #[test]
    fn test_catalog_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join(CATALOG_FILE);

        Catalog::from_index(&sample_index()).save(&path)?;
        let index = Catalog::load(&path).into_index();

        assert_eq!(index.len(), 1);
        assert_eq!(index.shelves().collect::<Vec<_>>(), vec!["Classics", "Empty"]);
        let book = index.books().next().unwrap();
        assert!(book.pinned);
        assert!(book.is_on_shelf("Classics"));
        assert_eq!(book.files[0].duration, Some(12.5));
        Ok(())
    }

    #[test]
    fn test_missing_catalog_is_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let catalog = Catalog::load(&dir.path().join(CATALOG_FILE));
        assert!(catalog.books.is_empty());
        assert!(catalog.shelves.is_empty());
        Ok(())
    }

    #[test]
    fn test_corrupt_catalog_is_empty() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join(CATALOG_FILE);
        fs::write(&path, b"{\"books\": [")?;
        assert!(Catalog::load(&path).books.is_empty());
        Ok(())
    }

    #[test]
    fn test_save_creates_data_dir() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join(CATALOG_FILE);
        Catalog::default().save(&path)?;
        assert!(path.exists());
        Ok(())
    }
}
