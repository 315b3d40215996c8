//! High-level library management: scanning, merging and the catalog file

use crate::catalog::{Catalog, CATALOG_FILE};
use crate::error::LibraryResult;
use crate::index::{LibraryIndex, MergeReport};
use crate::probe::{build_book, LoftyProbe, MetadataProbe, NoopProbe};
use crate::scanner::{LibraryScanner, ScannerConfig};
use lectern_config::LibraryConfig;
use lectern_core::{Book, Event};
use lectern_store::StateStore;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A self-contained scan that can run off the owning thread
#[derive(Clone)]
pub struct ScanJob {
    scanner: LibraryScanner,
    probe: Arc<dyn MetadataProbe>,
    roots: Vec<PathBuf>,
}

impl ScanJob {
    /// Walks the roots and probes every book found
    pub fn run(self) -> Vec<Book> {
        self.scanner
            .scan(&self.roots)
            .into_iter()
            .map(|candidate| build_book(candidate, self.probe.as_ref()))
            .collect()
    }
}

/// Owns the index and knows where it is persisted
pub struct LibraryManager {
    index: LibraryIndex,
    scanner: LibraryScanner,
    probe: Arc<dyn MetadataProbe>,
    catalog_path: PathBuf,
    roots: Vec<PathBuf>,
}

impl LibraryManager {
    /// Opens the library stored in `data_dir`, starting empty if no catalog exists
    pub fn open(config: &LibraryConfig, data_dir: &Path) -> Self {
        let catalog_path = data_dir.join(CATALOG_FILE);
        let index = Catalog::load(&catalog_path).into_index();
        info!(
            "Opened library at {} with {} books",
            catalog_path.display(),
            index.len()
        );

        let probe: Arc<dyn MetadataProbe> = if config.extract_metadata {
            Arc::new(LoftyProbe::new())
        } else {
            Arc::new(NoopProbe)
        };

        Self {
            index,
            scanner: LibraryScanner::new(ScannerConfig::from(config)),
            probe,
            catalog_path,
            roots: config.library_paths.clone(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn index(&self) -> &LibraryIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut LibraryIndex {
        &mut self.index
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Adds a scan root for this session. Returns false if already present.
    pub fn add_root(&mut self, root: impl Into<PathBuf>) -> bool {
        let root = root.into();
        if self.roots.contains(&root) {
            return false;
        }
        self.roots.push(root);
        true
    }

    /// Snapshot of everything a scan needs
    pub fn scan_job(&self) -> ScanJob {
        ScanJob {
            scanner: self.scanner.clone(),
            probe: Arc::clone(&self.probe),
            roots: self.roots.clone(),
        }
    }

    pub fn apply_scan(&mut self, books: Vec<Book>) -> MergeReport {
        self.index.merge(books)
    }

    /// Scans on the calling thread and merges the result
    pub fn rescan(&mut self) -> MergeReport {
        let books = self.scan_job().run();
        self.apply_scan(books)
    }

    pub fn hydrate(&mut self, store: &dyn StateStore) -> usize {
        self.index.hydrate(store)
    }

    pub fn save_catalog(&self) -> LibraryResult<()> {
        Catalog::from_index(&self.index).save(&self.catalog_path)
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.index.drain_events()
    }
}
