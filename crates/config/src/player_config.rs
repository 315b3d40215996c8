//! Player configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the sleep timer does when it runs out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SleepTimerAction {
    Pause,
    Stop,
}

impl std::fmt::Display for SleepTimerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SleepTimerAction::Pause => write!(f, "pause"),
            SleepTimerAction::Stop => write!(f, "stop"),
        }
    }
}

/// Player preferences and timing behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume for books that have never been opened (0-100)
    pub default_volume: u8,

    /// Clock tick period in milliseconds
    pub tick_interval_ms: u64,

    /// Unsaved position drift (seconds) written once the position settles
    pub save_threshold_secs: f64,

    /// Unsaved drift (seconds) written even while the position keeps moving
    pub save_max_drift_secs: f64,

    /// Rewind after a long pause
    pub smart_resume: bool,

    /// Idle gap (seconds) after which smart resume applies
    pub resume_idle_threshold_secs: u64,

    /// How far smart resume rewinds (seconds)
    pub resume_rewind_secs: f64,

    pub seek_forward_secs: f64,
    pub seek_backward_secs: f64,
    pub long_seek_forward_secs: f64,
    pub long_seek_backward_secs: f64,

    /// Playback rate change step
    pub rate_step: f64,

    /// Volume change step (0-100)
    pub volume_step: u8,

    /// Default sleep timer length in minutes
    pub sleep_timer_minutes: u32,

    pub sleep_timer_action: SleepTimerAction,

    /// Announce the sleep timer this many seconds before it fires
    pub timer_warning_secs: u64,

    /// Fade volume out over the last seconds of the sleep timer (0 disables)
    pub timer_fade_secs: u64,

    /// Upper bound on the synchronous flush at close and shutdown
    pub flush_timeout_ms: u64,

    /// Upper bound on any single transport call
    pub transport_timeout_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 100,
            tick_interval_ms: 500,
            save_threshold_secs: 3.0,
            save_max_drift_secs: 30.0,
            smart_resume: true,
            resume_idle_threshold_secs: 300,
            resume_rewind_secs: 5.0,
            seek_forward_secs: 30.0,
            seek_backward_secs: 10.0,
            long_seek_forward_secs: 300.0,
            long_seek_backward_secs: 300.0,
            rate_step: 0.1,
            volume_step: 5,
            sleep_timer_minutes: 30,
            sleep_timer_action: SleepTimerAction::Pause,
            timer_warning_secs: 60,
            timer_fade_secs: 10,
            flush_timeout_ms: 2000,
            transport_timeout_ms: 3000,
        }
    }
}

impl PlayerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_millis(self.transport_timeout_ms)
    }

    /// Smart resume rewind, or zero when disabled
    pub fn effective_rewind_secs(&self) -> f64 {
        if self.smart_resume {
            self.resume_rewind_secs
        } else {
            0.0
        }
    }
}

impl ConfigSection for PlayerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.default_volume, 0, 100, "player.default_volume"),
            Validator::in_range(self.tick_interval_ms, 50, 5000, "player.tick_interval_ms"),
            Validator::in_range(
                self.save_threshold_secs,
                0.5,
                300.0,
                "player.save_threshold_secs",
            ),
            Validator::in_range(
                self.save_max_drift_secs,
                1.0,
                3600.0,
                "player.save_max_drift_secs",
            ),
            Validator::in_range(
                self.resume_idle_threshold_secs,
                1,
                86_400,
                "player.resume_idle_threshold_secs",
            ),
            Validator::in_range(self.resume_rewind_secs, 0.0, 300.0, "player.resume_rewind_secs"),
            Validator::in_range(self.seek_forward_secs, 1.0, 3600.0, "player.seek_forward_secs"),
            Validator::in_range(self.seek_backward_secs, 1.0, 3600.0, "player.seek_backward_secs"),
            Validator::in_range(
                self.long_seek_forward_secs,
                1.0,
                7200.0,
                "player.long_seek_forward_secs",
            ),
            Validator::in_range(
                self.long_seek_backward_secs,
                1.0,
                7200.0,
                "player.long_seek_backward_secs",
            ),
            Validator::in_range(self.rate_step, 0.01, 0.5, "player.rate_step"),
            Validator::in_range(self.volume_step, 1, 50, "player.volume_step"),
            Validator::in_range(self.sleep_timer_minutes, 1, 1440, "player.sleep_timer_minutes"),
            Validator::in_range(self.timer_warning_secs, 0, 3600, "player.timer_warning_secs"),
            Validator::in_range(self.timer_fade_secs, 0, 600, "player.timer_fade_secs"),
            Validator::in_range(self.flush_timeout_ms, 100, 60_000, "player.flush_timeout_ms"),
            Validator::in_range(
                self.transport_timeout_ms,
                100,
                60_000,
                "player.transport_timeout_ms",
            ),
        ])
    }

    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn section_name(&self) -> &'static str {
        "player"
    }
}
