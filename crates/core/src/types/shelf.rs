//! Shelves: user collections and computed views

use serde::{Deserialize, Serialize};
use std::fmt;

const PINNED: &str = "Pinned";
const ALL_BOOKS: &str = "All Books";
const FINISHED: &str = "Finished";

/// A shelf in the library.
///
/// Only `User` shelves hold memberships; the others are computed views over
/// book flags and cannot be mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shelf {
    User(String),
    Pinned,
    AllBooks,
    Finished,
}

impl Shelf {
    pub fn user(name: impl Into<String>) -> Self {
        Self::User(name.into())
    }

    pub fn is_virtual(&self) -> bool {
        !matches!(self, Self::User(_))
    }

    /// Display name of the shelf
    pub fn name(&self) -> &str {
        match self {
            Self::User(name) => name,
            Self::Pinned => PINNED,
            Self::AllBooks => ALL_BOOKS,
            Self::Finished => FINISHED,
        }
    }

    /// Parses a shelf name, recognizing the virtual shelves case-insensitively
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        match trimmed.to_lowercase().as_str() {
            "pinned" => Self::Pinned,
            "all books" | "all" | "allbooks" => Self::AllBooks,
            "finished" => Self::Finished,
            _ => Self::User(trimmed.to_string()),
        }
    }

    /// True if a user shelf may not take this name
    pub fn is_reserved_name(name: &str) -> bool {
        Self::parse(name).is_virtual()
    }
}

impl fmt::Display for Shelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_virtual_names() {
        assert_eq!(Shelf::parse("pinned"), Shelf::Pinned);
        assert_eq!(Shelf::parse(" All Books "), Shelf::AllBooks);
        assert_eq!(Shelf::parse("FINISHED"), Shelf::Finished);
        assert_eq!(Shelf::parse(" Sci-Fi "), Shelf::user("Sci-Fi"));
    }

    #[test]
    fn test_only_user_shelves_are_mutable() {
        assert!(!Shelf::user("Mystery").is_virtual());
        assert!(Shelf::Pinned.is_virtual());
        assert!(Shelf::AllBooks.is_virtual());
        assert!(Shelf::Finished.is_virtual());
        assert!(Shelf::is_reserved_name("finished"));
        assert!(!Shelf::is_reserved_name("Later"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Shelf::AllBooks.to_string(), "All Books");
        assert_eq!(Shelf::user("Later").to_string(), "Later");
    }
}
