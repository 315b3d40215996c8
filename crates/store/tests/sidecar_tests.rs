//! Sidecar persistence: round trips, crash safety, corrupt records

use lectern_core::{BookKey, BookKind, BookLocator, Bookmark, LoopRange, SessionState, Timestamp};
use lectern_store::{sidecar_path, SidecarStore, StateStore};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn directory_book(dir: &Path) -> BookLocator {
    BookLocator {
        key: BookKey::from_root(dir),
        root: dir.to_path_buf(),
        kind: BookKind::Directory,
    }
}

fn sample_state() -> SessionState {
    let mut state = SessionState::new(80);
    state.position = 1234.5;
    state.rate = 1.75;
    state.equalizer = "voice".to_string();
    state.loop_range = LoopRange::new(10.0, 40.0);
    state.bookmarks = vec![
        Bookmark::with_label(100.0, "Chapter start", Timestamp::from_millis(1_000)),
        Bookmark::new(900.0, Timestamp::from_millis(2_000)),
    ];
    state.finished = false;
    state.last_played = Some(Timestamp::from_millis(1_700_000_000_000));
    state
}

#[test]
fn test_missing_record_loads_as_none() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = SidecarStore::new();
    assert!(store.load(&directory_book(dir.path()))?.is_none());

    let state = store.load_or_default(&directory_book(dir.path()), 65);
    assert_eq!(state.position, 0.0);
    assert_eq!(state.rate, 1.0);
    assert_eq!(state.volume, 65);
    Ok(())
}

#[test]
fn test_save_load_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = SidecarStore::new();
    let locator = directory_book(dir.path());
    let state = sample_state();

    store.save(&locator, &state)?;
    assert!(dir.path().join(".lectern-session.json").exists());

    let loaded = store.load(&locator)?.expect("record exists");
    assert_eq!(loaded, state);
    Ok(())
}

#[test]
fn test_single_file_book_record_sits_next_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let file = dir.path().join("dune.m4b");
    fs::write(&file, b"audio")?;
    let locator = BookLocator {
        key: BookKey::from_root(&file),
        root: file.clone(),
        kind: BookKind::SingleFile,
    };

    let store = SidecarStore::new();
    store.save(&locator, &sample_state())?;

    assert!(dir.path().join("dune.m4b.lectern-session.json").exists());
    assert_eq!(store.load(&locator)?, Some(sample_state()));
    Ok(())
}

#[test]
fn test_interrupted_write_leaves_previous_record() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = SidecarStore::new();
    let locator = directory_book(dir.path());
    let state = sample_state();
    store.save(&locator, &state)?;

    // A crash after the temp file was written but before the rename
    let mut partial = tempfile::Builder::new()
        .prefix(".lectern-")
        .suffix(".tmp")
        .tempfile_in(dir.path())?;
    partial.write_all(br#"{"format": 1, "position": 99"#)?;
    let (_file, _kept_path) = partial.keep()?;

    let loaded = store.load(&locator)?.expect("previous record survives");
    assert_eq!(loaded, state);

    let mut next = state.clone();
    next.position = 2000.0;
    store.save(&locator, &next)?;
    assert_eq!(store.load(&locator)?.map(|s| s.position), Some(2000.0));
    Ok(())
}

#[test]
fn test_corrupt_record_is_untouched_until_next_save() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = SidecarStore::new();
    let locator = directory_book(dir.path());
    let path = sidecar_path(&locator);
    fs::write(&path, b"{ not json")?;

    assert!(store.load(&locator)?.is_none());
    assert_eq!(fs::read(&path)?, b"{ not json");

    store.save(&locator, &sample_state())?;
    let backup = dir.path().join(".lectern-session.json.corrupt");
    assert_eq!(fs::read(backup)?, b"{ not json");
    assert_eq!(store.load(&locator)?, Some(sample_state()));
    Ok(())
}

#[test]
fn test_empty_record_is_treated_as_missing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = SidecarStore::new();
    let locator = directory_book(dir.path());
    fs::write(sidecar_path(&locator), b"")?;

    assert!(store.load(&locator)?.is_none());
    Ok(())
}

#[test]
fn test_out_of_range_volume_keeps_the_position() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = SidecarStore::new();
    let locator = directory_book(dir.path());
    fs::write(
        sidecar_path(&locator),
        br#"{"format": 1, "position": 50, "volume": 300, "rate": 0.1}"#,
    )?;

    let state = store.load(&locator)?.ok_or("record dropped")?;
    assert_eq!(state.position, 50.0);
    assert_eq!(state.volume, 100);
    assert_eq!(state.rate, 0.5);
    Ok(())
}

#[test]
fn test_unknown_fields_survive_a_save() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let store = SidecarStore::new();
    let locator = directory_book(dir.path());
    fs::write(
        sidecar_path(&locator),
        br#"{"format": 1, "position": 42.0, "sync_token": "abc", "cover": {"hue": 200}}"#,
    )?;

    let mut state = store.load(&locator)?.expect("record exists");
    assert_eq!(state.position, 42.0);
    state.position = 50.0;
    store.save(&locator, &state)?;

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(sidecar_path(&locator))?)?;
    assert_eq!(raw["format"], 1);
    assert_eq!(raw["position"], 50.0);
    assert_eq!(raw["sync_token"], "abc");
    assert_eq!(raw["cover"]["hue"], 200);
    Ok(())
}

#[test]
fn test_save_into_missing_directory_fails() {
    let dir = TempDir::new().expect("temp dir");
    let store = SidecarStore::new();
    let locator = directory_book(&dir.path().join("moved-away"));

    assert!(store.save(&locator, &sample_state()).is_err());
}
