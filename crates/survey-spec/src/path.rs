//! Dot-separated key paths addressing survey items.
//!
//! Every item key is its parent's key followed by one segment, e.g.
//! `weekly.symptoms.Q1`. Cross-item references inside expressions are
//! stored as these literal strings, so renames have to rewrite whole
//! prefixes rather than single segments.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("key path is empty")]
    Empty,
    #[error("invalid key segment '{segment}' in '{path}'")]
    InvalidSegment { path: String, segment: String },
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static segment pattern"))
}

/// Returns true when `segment` can be used as one component of a key path.
pub fn is_valid_segment(segment: &str) -> bool {
    segment_pattern().is_match(segment)
}

/// Path of a survey item, stored as segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPath {
    segments: Vec<String>,
}

impl ItemPath {
    /// Parses and validates a dot-separated key.
    pub fn parse(key: &str) -> Result<Self, PathError> {
        if key.is_empty() {
            return Err(PathError::Empty);
        }
        let segments = key.split('.').map(String::from).collect::<Vec<_>>();
        if let Some(segment) = segments.iter().find(|segment| !is_valid_segment(segment)) {
            return Err(PathError::InvalidSegment {
                path: key.to_string(),
                segment: segment.clone(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path one level deeper.
    pub fn child(&self, segment: &str) -> Result<Self, PathError> {
        if !is_valid_segment(segment) {
            return Err(PathError::InvalidSegment {
                path: format!("{}.{}", self, segment),
                segment: segment.to_string(),
            });
        }
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Parent path, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Segment-wise prefix test; `a.b` is not a prefix of `a.bc`.
    pub fn starts_with(&self, prefix: &ItemPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Swaps `old` for `new` at the front of this path.
    pub fn replace_prefix(&self, old: &ItemPath, new: &ItemPath) -> Option<Self> {
        if !self.starts_with(old) {
            return None;
        }
        let mut segments = new.segments.clone();
        segments.extend_from_slice(&self.segments[old.segments.len()..]);
        Some(Self { segments })
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl std::str::FromStr for ItemPath {
    type Err = PathError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// String form of [`ItemPath::replace_prefix`] for keys that were never parsed.
pub fn rewrite_key_prefix(key: &str, old: &str, new: &str) -> Option<String> {
    if key == old {
        return Some(new.to_string());
    }
    key.strip_prefix(old)
        .and_then(|rest| rest.strip_prefix('.'))
        .map(|rest| format!("{}.{}", new, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_empty_segments() {
        assert_eq!(ItemPath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            ItemPath::parse("survey..q1"),
            Err(PathError::InvalidSegment { .. })
        ));
        assert!(ItemPath::parse("survey.q 1").is_err());
    }

    #[test]
    fn child_and_parent_are_inverse() {
        let root = ItemPath::parse("weekly").unwrap();
        let child = root.child("Q1").unwrap();
        assert_eq!(child.to_string(), "weekly.Q1");
        assert_eq!(child.parent(), Some(root));
        assert_eq!(child.last(), Some("Q1"));
    }

    #[test]
    fn prefix_checks_whole_segments() {
        let item = ItemPath::parse("s.g10.q1").unwrap();
        assert!(!item.starts_with(&ItemPath::parse("s.g1").unwrap()));
        assert!(item.starts_with(&ItemPath::parse("s.g10").unwrap()));
    }

    #[test]
    fn replace_prefix_keeps_tail() {
        let item = ItemPath::parse("s.g1.q1.a").unwrap();
        let old = ItemPath::parse("s.g1").unwrap();
        let new = ItemPath::parse("s.other.g2").unwrap();
        assert_eq!(
            item.replace_prefix(&old, &new).unwrap().to_string(),
            "s.other.g2.q1.a"
        );
    }

    #[test]
    fn string_rewrite_matches_segment_boundaries() {
        assert_eq!(rewrite_key_prefix("s.g1", "s.g1", "s.x"), Some("s.x".into()));
        assert_eq!(rewrite_key_prefix("s.g1.q", "s.g1", "s.x"), Some("s.x.q".into()));
        assert_eq!(rewrite_key_prefix("s.g10", "s.g1", "s.x"), None);
    }
}
