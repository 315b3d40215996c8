//! Tag and duration probing for media files

use crate::error::{LibraryError, LibraryResult};
use crate::scanner::BookCandidate;
use lectern_core::{Book, BookKind, Chapter, MediaFile};
use lofty::prelude::*;
use lofty::probe::Probe;
use log::{debug, warn};
use std::path::Path;

/// What a probe learned about one media file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbedMedia {
    pub title: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    /// Embedded chapter marks, offsets relative to the file start
    pub chapters: Vec<Chapter>,
}

/// Reads title, duration and chapter marks from a media file
pub trait MetadataProbe: Send + Sync {
    fn probe(&self, path: &Path) -> LibraryResult<ProbedMedia>;
}

/// Probe backed by `lofty`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyProbe;

impl LoftyProbe {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataProbe for LoftyProbe {
    fn probe(&self, path: &Path) -> LibraryResult<ProbedMedia> {
        let metadata_error = |e: lofty::error::LoftyError| LibraryError::MetadataError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let tagged_file = Probe::open(path)
            .map_err(metadata_error)?
            .read()
            .map_err(metadata_error)?;

        let duration = tagged_file.properties().duration().as_secs_f64();
        let title = tagged_file
            .primary_tag()
            .or_else(|| tagged_file.first_tag())
            .and_then(|tag| tag.title().map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty());

        // lofty exposes no chapter atoms; callers fall back to file boundaries
        Ok(ProbedMedia {
            title,
            duration: (duration > 0.0).then_some(duration),
            chapters: Vec::new(),
        })
    }
}

/// Probe used when metadata extraction is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProbe;

impl MetadataProbe for NoopProbe {
    fn probe(&self, _path: &Path) -> LibraryResult<ProbedMedia> {
        Ok(ProbedMedia::default())
    }
}

/// Probes every file of a candidate and assembles the book.
///
/// A failed probe leaves that file's duration unknown. Multi-file books get
/// one chapter per file as long as the file start offsets are known.
pub fn build_book(candidate: BookCandidate, probe: &dyn MetadataProbe) -> Book {
    let mut files = Vec::with_capacity(candidate.files.len());
    let mut probed = Vec::with_capacity(candidate.files.len());

    for path in candidate.files {
        let media = match probe.probe(&path) {
            Ok(media) => media,
            Err(e) => {
                warn!("{}", e);
                ProbedMedia::default()
            }
        };
        files.push(MediaFile::new(path, media.duration));
        probed.push(media);
    }

    let title = match candidate.kind {
        BookKind::SingleFile => probed
            .first()
            .and_then(|m| m.title.clone())
            .unwrap_or(candidate.title),
        BookKind::Directory => candidate.title,
    };

    let chapters = collect_chapters(&files, &probed);
    debug!(
        "Built book '{}' with {} files and {} chapters",
        title,
        files.len(),
        chapters.len()
    );

    Book::new(title, candidate.root, candidate.kind, files).with_chapters(chapters)
}

fn collect_chapters(files: &[MediaFile], probed: &[ProbedMedia]) -> Vec<Chapter> {
    if files.len() == 1 {
        return probed
            .first()
            .map(|m| m.chapters.clone())
            .unwrap_or_default();
    }

    let mut chapters = Vec::new();
    let mut start = 0.0;
    for (file, media) in files.iter().zip(probed) {
        let label = media.title.clone().unwrap_or_else(|| {
            file.path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        chapters.push(Chapter::new(label, start));
        chapters.extend(
            media
                .chapters
                .iter()
                .filter(|c| c.start > 0.0)
                .map(|c| Chapter::new(c.title.clone(), start + c.start)),
        );

        match file.duration {
            Some(d) => start += d,
            None => break,
        }
    }
    chapters
}
