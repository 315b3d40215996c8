//! LibraryManager end to end: scan, shelve, persist, reopen

use lectern_config::LibraryConfig;
use lectern_core::{Event, SessionState, Shelf, Timestamp};
use lectern_library::{
    LibraryManager, LibraryResult, MetadataProbe, NoopProbe, ProbedMedia, CATALOG_FILE,
};
use lectern_store::{SidecarStore, StateStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Reports every file as ten minutes long
struct TenMinuteProbe;

impl MetadataProbe for TenMinuteProbe {
    fn probe(&self, _path: &Path) -> LibraryResult<ProbedMedia> {
        Ok(ProbedMedia {
            title: None,
            duration: Some(600.0),
            chapters: Vec::new(),
        })
    }
}

fn create_audio_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, vec![0u8; 2048]).unwrap();
    path
}

fn library_config(root: &Path) -> LibraryConfig {
    LibraryConfig {
        library_paths: vec![root.to_path_buf()],
        ..LibraryConfig::default()
    }
}

#[test]
fn test_rescan_builds_books_with_durations() -> Result<()> {
    let media = TempDir::new()?;
    let data = TempDir::new()?;
    create_audio_file(media.path(), "Trilogy/1.mp3");
    create_audio_file(media.path(), "Trilogy/2.mp3");
    create_audio_file(media.path(), "Novella.m4b");

    let mut manager = LibraryManager::open(&library_config(media.path()), data.path())
        .with_probe(Arc::new(TenMinuteProbe));
    let report = manager.rescan();

    assert_eq!(report.added.len(), 2);
    let trilogy = manager
        .index()
        .search("trilogy")
        .next()
        .ok_or("trilogy missing")?;
    assert_eq!(trilogy.total_duration(), Some(1200.0));
    assert_eq!(trilogy.chapters.len(), 2);
    assert_eq!(trilogy.chapters[1].start, 600.0);

    let events = manager.drain_events();
    assert_eq!(
        events.iter().filter(|e| matches!(e, Event::BookAdded { .. })).count(),
        2
    );
    Ok(())
}

#[test]
fn test_catalog_survives_reopen() -> Result<()> {
    let media = TempDir::new()?;
    let data = TempDir::new()?;
    create_audio_file(media.path(), "Emma/01.mp3");
    let config = library_config(media.path());

    let key = {
        let mut manager =
            LibraryManager::open(&config, data.path()).with_probe(Arc::new(NoopProbe));
        manager.rescan();
        let key = manager.index().books().next().ok_or("no book")?.key.clone();
        manager
            .index_mut()
            .assign_shelf(&key, &Shelf::user("Classics"))?;
        manager.index_mut().pin(&key)?;
        manager.save_catalog()?;
        key
    };
    assert!(data.path().join(CATALOG_FILE).exists());

    let mut reopened = LibraryManager::open(&config, data.path()).with_probe(Arc::new(NoopProbe));
    let report = reopened.rescan();
    assert!(report.added.is_empty());

    let book = reopened.index().get(&key).ok_or("book lost")?;
    assert!(book.pinned);
    assert!(book.is_on_shelf("Classics"));
    Ok(())
}

#[test]
fn test_removed_media_keeps_catalog_entry() -> Result<()> {
    let media = TempDir::new()?;
    let data = TempDir::new()?;
    let file = create_audio_file(media.path(), "Gone.mp3");

    let mut manager = LibraryManager::open(&library_config(media.path()), data.path())
        .with_probe(Arc::new(NoopProbe));
    manager.rescan();
    fs::remove_file(file)?;
    let report = manager.rescan();

    assert!(!report.has_changes());
    assert_eq!(manager.index().len(), 1);
    Ok(())
}

#[test]
fn test_hydrate_reads_sidecars() -> Result<()> {
    let media = TempDir::new()?;
    let data = TempDir::new()?;
    create_audio_file(media.path(), "Read/01.mp3");
    create_audio_file(media.path(), "Unread/01.mp3");

    let mut manager = LibraryManager::open(&library_config(media.path()), data.path())
        .with_probe(Arc::new(NoopProbe));
    manager.rescan();

    let store = SidecarStore::new();
    let read = manager
        .index()
        .search("Read")
        .find(|b| b.title == "Read")
        .ok_or("missing book")?
        .locator();
    let mut state = SessionState::default();
    state.finished = true;
    state.last_played = Some(Timestamp::from_millis(42_000));
    store.save(&read, &state)?;

    assert_eq!(manager.hydrate(&store), 1);
    let history = manager.index().history(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].title, "Read");
    assert_eq!(manager.index().list_by_shelf(&Shelf::Finished)?.len(), 1);
    Ok(())
}

#[test]
fn test_scan_job_runs_on_another_thread() -> Result<()> {
    let media = TempDir::new()?;
    let data = TempDir::new()?;
    create_audio_file(media.path(), "Threaded.mp3");

    let mut manager = LibraryManager::open(&library_config(media.path()), data.path())
        .with_probe(Arc::new(NoopProbe));
    let job = manager.scan_job();
    let books = std::thread::spawn(move || job.run())
        .join()
        .map_err(|_| "scan thread panicked")?;

    assert_eq!(manager.apply_scan(books).added.len(), 1);
    Ok(())
}

#[test]
fn test_add_root_deduplicates() -> Result<()> {
    let data = TempDir::new()?;
    let mut manager = LibraryManager::open(&LibraryConfig::default(), data.path());
    assert!(manager.add_root("/audiobooks"));
    assert!(!manager.add_root("/audiobooks"));
    assert_eq!(manager.roots().len(), 1);
    Ok(())
}
