//! Bookmarks and A-B loop ranges

use crate::types::{Timestamp, Validator};
use serde::{Deserialize, Serialize};

/// A user bookmark at an offset on the book's global timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Seconds from the start of the book
    pub offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: Timestamp,
}

impl Bookmark {
    /// Creates a new bookmark at the specified offset
    pub fn new(offset: f64, created_at: Timestamp) -> Self {
        Self {
            offset: offset.max(0.0),
            label: None,
            created_at,
        }
    }

    /// Creates a bookmark with a label
    pub fn with_label(offset: f64, label: impl Into<String>, created_at: Timestamp) -> Self {
        let mut bookmark = Self::new(offset, created_at);
        let label = label.into();
        if !label.trim().is_empty() {
            bookmark.label = Some(label);
        }
        bookmark
    }

    pub fn has_label(&self) -> bool {
        self.label.as_ref().is_some_and(|l| !l.trim().is_empty())
    }
}

impl Validator for Bookmark {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.offset.is_finite() || self.offset < 0.0 {
            errors.push("Bookmark offset must be a non-negative number".to_string());
        }

        if let Some(label) = &self.label {
            if label.trim().is_empty() {
                errors.push("Bookmark label cannot be empty if provided".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Inserts a bookmark keeping the list in ascending offset order.
///
/// Bookmarks at an equal offset keep their insertion order. Returns the index
/// the bookmark landed at.
pub fn insert_sorted(bookmarks: &mut Vec<Bookmark>, bookmark: Bookmark) -> usize {
    let index = bookmarks.partition_point(|b| b.offset <= bookmark.offset);
    bookmarks.insert(index, bookmark);
    index
}

/// An A-B loop range on the global timeline. Always `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopRange {
    a: f64,
    b: f64,
}

impl LoopRange {
    /// Builds an ordered range from two marker positions.
    ///
    /// Markers are swapped if given in reverse. Equal or non-finite markers
    /// produce `None`.
    pub fn new(first: f64, second: f64) -> Option<Self> {
        if !first.is_finite() || !second.is_finite() || first == second {
            return None;
        }
        let (a, b) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        Some(Self { a: a.max(0.0), b })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.a && position < self.b
    }

    /// True once the loop must wrap back to A
    pub fn should_wrap(&self, position: f64) -> bool {
        position >= self.b
    }

    pub fn is_valid(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.a >= 0.0 && self.a < self.b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset: f64) -> Bookmark {
        Bookmark::new(offset, Timestamp::from_millis(0))
    }

    #[test]
    fn test_bookmark_with_blank_label_has_none() {
        let b = Bookmark::with_label(12.0, "   ", Timestamp::from_millis(1));
        assert!(!b.has_label());
        assert!(b.is_valid());
    }

    #[test]
    fn test_bookmark_negative_offset_clamped() {
        assert_eq!(at(-3.0).offset, 0.0);
    }

    #[test]
    fn test_insert_sorted_keeps_order() {
        let mut list = vec![at(10.0), at(30.0)];
        assert_eq!(insert_sorted(&mut list, at(20.0)), 1);
        assert_eq!(insert_sorted(&mut list, at(5.0)), 0);
        assert_eq!(insert_sorted(&mut list, at(30.0)), 4);
        let offsets: Vec<f64> = list.iter().map(|b| b.offset).collect();
        assert_eq!(offsets, vec![5.0, 10.0, 20.0, 30.0, 30.0]);
    }

    #[test]
    fn test_loop_range_orders_markers() {
        let range = LoopRange::new(40.0, 10.0).unwrap();
        assert_eq!(range.a(), 10.0);
        assert_eq!(range.b(), 40.0);
        assert!(range.contains(10.0));
        assert!(!range.contains(40.0));
        assert!(range.should_wrap(41.0));
    }

    #[test]
    fn test_loop_range_rejects_equal_markers() {
        assert!(LoopRange::new(5.0, 5.0).is_none());
        assert!(LoopRange::new(f64::NAN, 5.0).is_none());
    }

    #[test]
    fn test_label_is_omitted_from_json_when_absent() {
        let json = serde_json::to_string(&at(1.5)).unwrap();
        assert!(!json.contains("label"));
        assert!(json.contains("\"offset\":1.5"));
    }
}
