//! Lectern library management
//!
//! Scans library roots into books, keeps the shelf and pin state, and
//! persists it all as a catalog in the data directory. Listening progress is
//! read from the per-book session records, never stored here.

pub mod catalog;
pub mod error;
pub mod index;
pub mod manager;
pub mod probe;
pub mod scanner;

pub use catalog::{Catalog, CATALOG_FILE};
pub use error::{LibraryError, LibraryResult};
pub use index::{LibraryIndex, MergeReport, PinMove};
pub use manager::{LibraryManager, ScanJob};
pub use probe::{build_book, LoftyProbe, MetadataProbe, NoopProbe, ProbedMedia};
pub use scanner::{natural_cmp, BookCandidate, LibraryScanner, ScannerConfig};
