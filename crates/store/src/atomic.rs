//! Crash-safe file replacement
//!
//! The new content goes to a temp file in the target's directory, is synced,
//! and then renamed over the target. Readers see either the old file or the
//! new one, never a mix.

use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Prefix of in-flight temp files; readers never open these
pub const TEMP_PREFIX: &str = ".lectern-";

/// Atomically replaces `path` with `bytes`
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file: NamedTempFile = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;

    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("record.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        write_atomic(&dir.path().join("a.json"), b"{}").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json".to_string()]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone").join("a.json");
        assert!(write_atomic(&path, b"{}").is_err());
    }
}
