//! Per-book session state persisted by the state store

use crate::types::{Bookmark, LoopRange, Timestamp, Validator};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Slowest supported playback rate
pub const MIN_RATE: f64 = 0.5;
/// Fastest supported playback rate
pub const MAX_RATE: f64 = 3.0;
/// Loudest volume level
pub const MAX_VOLUME: u8 = 100;
/// Equalizer preset applied when none has been chosen
pub const DEFAULT_EQUALIZER: &str = "flat";

/// Clamps a playback rate to the supported range, mapping garbage to 1.0
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(MIN_RATE, MAX_RATE)
    } else {
        1.0
    }
}

/// Everything remembered about one book between sessions.
///
/// Numbers are read leniently: an out-of-range rate or volume is clamped
/// rather than making the whole record unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Seconds from the start of the book
    #[serde(default, deserialize_with = "lenient_position")]
    pub position: f64,
    #[serde(default = "default_rate", deserialize_with = "lenient_rate")]
    pub rate: f64,
    #[serde(default = "default_volume", deserialize_with = "lenient_volume")]
    pub volume: u8,
    #[serde(default = "default_equalizer")]
    pub equalizer: String,
    #[serde(default, rename = "loop")]
    pub loop_range: Option<LoopRange>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub last_played: Option<Timestamp>,
    /// Fields written by newer versions, carried through untouched
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_rate() -> f64 {
    1.0
}

fn default_volume() -> u8 {
    MAX_VOLUME
}

fn default_equalizer() -> String {
    DEFAULT_EQUALIZER.to_string()
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn lenient_position<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number(deserializer)?.unwrap_or(0.0))
}

fn lenient_rate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number(deserializer)?.map_or_else(default_rate, clamp_rate))
}

fn lenient_volume<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(number(deserializer)?.map_or_else(default_volume, |volume| {
        volume.round().clamp(0.0, f64::from(MAX_VOLUME)) as u8
    }))
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(MAX_VOLUME)
    }
}

impl SessionState {
    /// Fresh state for a book that has never been opened
    pub fn new(volume: u8) -> Self {
        Self {
            position: 0.0,
            rate: 1.0,
            volume: volume.min(MAX_VOLUME),
            equalizer: default_equalizer(),
            loop_range: None,
            bookmarks: Vec::new(),
            finished: false,
            last_played: None,
            extensions: Map::new(),
        }
    }

    /// Repairs values read from disk so every invariant holds.
    ///
    /// Rate and volume are clamped, a non-finite or negative position becomes 0
    /// (and is capped at `duration` when known), invalid loop ranges are dropped
    /// and bookmarks are re-sorted.
    pub fn sanitize(&mut self, duration: Option<f64>) {
        self.rate = clamp_rate(self.rate);
        self.volume = self.volume.min(MAX_VOLUME);

        if !self.position.is_finite() || self.position < 0.0 {
            self.position = 0.0;
        }
        if let Some(total) = duration {
            self.position = self.position.min(total.max(0.0));
        }

        if self.loop_range.is_some_and(|range| !range.is_valid()) {
            self.loop_range = None;
        }

        if self.equalizer.trim().is_empty() {
            self.equalizer = default_equalizer();
        }

        self.bookmarks.retain(|b| b.is_valid());
        self.bookmarks.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    }
}

impl Validator for SessionState {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.position.is_finite() || self.position < 0.0 {
            errors.push("Position must be a non-negative number".to_string());
        }

        if !(MIN_RATE..=MAX_RATE).contains(&self.rate) {
            errors.push(format!(
                "Rate must be between {} and {}",
                MIN_RATE, MAX_RATE
            ));
        }

        if self.volume > MAX_VOLUME {
            errors.push("Volume must be between 0 and 100".to_string());
        }

        if self.loop_range.is_some_and(|range| !range.is_valid()) {
            errors.push("Loop marker A must precede marker B".to_string());
        }

        if self.bookmarks.windows(2).any(|w| w[0].offset > w[1].offset) {
            errors.push("Bookmarks must be sorted by offset".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
