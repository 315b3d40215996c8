//! Maps a book's global timeline onto its individual files

use crate::types::MediaFile;

/// Per-file durations of a book, in playback order.
///
/// Positions are expressed on one monotonic timeline covering every file.
/// A file whose duration is unknown ends the addressable part of the
/// timeline: positions past its start land inside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    durations: Vec<Option<f64>>,
}

impl Timeline {
    pub fn new(durations: Vec<Option<f64>>) -> Self {
        Self { durations }
    }

    pub fn from_files(files: &[MediaFile]) -> Self {
        Self::new(files.iter().map(|f| f.duration).collect())
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn file_duration(&self, index: usize) -> Option<f64> {
        self.durations.get(index).copied().flatten()
    }

    /// Records a learned duration. Returns true if anything changed.
    pub fn set_duration(&mut self, index: usize, secs: f64) -> bool {
        if !secs.is_finite() || secs < 0.0 {
            return false;
        }
        match self.durations.get_mut(index) {
            Some(slot) if *slot != Some(secs) => {
                *slot = Some(secs);
                true
            }
            _ => false,
        }
    }

    /// Global offset at which file `index` starts, if every earlier file is known
    pub fn file_start(&self, index: usize) -> Option<f64> {
        if index >= self.durations.len() {
            return None;
        }
        self.durations[..index]
            .iter()
            .try_fold(0.0, |acc, d| d.map(|d| acc + d))
    }

    /// Total duration, known only when every file is known
    pub fn total(&self) -> Option<f64> {
        if self.durations.is_empty() {
            return None;
        }
        self.durations
            .iter()
            .try_fold(0.0, |acc, d| d.map(|d| acc + d))
    }

    /// Finds the file containing a global position and the offset inside it.
    ///
    /// A position exactly on a file boundary belongs to the later file. The
    /// offset in the last file never exceeds its duration.
    pub fn locate(&self, position: f64) -> Option<(usize, f64)> {
        let last = self.durations.len().checked_sub(1)?;
        let position = position.max(0.0);
        let mut start = 0.0;
        for (index, duration) in self.durations.iter().enumerate() {
            match duration {
                Some(d) if index == last => return Some((index, (position - start).min(*d))),
                Some(d) if position < start + d => return Some((index, position - start)),
                Some(d) => start += d,
                None => return Some((index, position - start)),
            }
        }
        None
    }

    /// Converts a per-file offset into a global position
    pub fn global(&self, index: usize, offset: f64) -> Option<f64> {
        self.file_start(index).map(|start| start + offset.max(0.0))
    }
}
