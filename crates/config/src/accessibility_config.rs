//! Screen reader announcement settings

use crate::validation::{ConfigSection, ValidationError};
use serde::{Deserialize, Serialize};

/// How much the announcer says
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Only critical messages
    Silent,
    /// Critical and minimal messages
    Minimal,
    /// Everything
    Full,
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verbosity::Silent => write!(f, "silent"),
            Verbosity::Minimal => write!(f, "minimal"),
            Verbosity::Full => write!(f, "full"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccessibilityConfig {
    pub verbosity: Verbosity,

    /// Keep announcing non-critical messages while the app is not focused
    /// (feedback for global hotkeys)
    pub announce_when_unfocused: bool,
}

impl Default for AccessibilityConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Full,
            announce_when_unfocused: true,
        }
    }
}

impl ConfigSection for AccessibilityConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Ok(())
    }

    fn merge(&mut self, other: Self) {
        self.verbosity = other.verbosity;
        self.announce_when_unfocused = other.announce_when_unfocused;
    }

    fn section_name(&self) -> &'static str {
        "accessibility"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Silent < Verbosity::Minimal);
        assert!(Verbosity::Minimal < Verbosity::Full);
    }

    #[test]
    fn test_verbosity_parses_lowercase() {
        let config: AccessibilityConfig = toml::from_str("verbosity = \"minimal\"").unwrap();
        assert_eq!(config.verbosity, Verbosity::Minimal);
        assert!(config.announce_when_unfocused);
    }
}
