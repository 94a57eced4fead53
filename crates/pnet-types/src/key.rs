use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Separator between key segments in textual form.
pub const SEPARATOR: char = '.';

/// A hierarchical key: an ordered, non-empty sequence of segments.
///
/// Keys are immutable values. The textual form joins segments with
/// [`SEPARATOR`], so a segment can never contain the separator itself and
/// can never be empty.
///
/// # Examples
///
/// ```
/// use pnet_types::Key;
///
/// let key = Key::parse("a.b.c").unwrap();
/// assert_eq!(key.len(), 3);
/// assert_eq!(key.to_string(), "a.b.c");
/// assert!(Key::parse("a..c").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// Build a key from already-split segments.
    pub fn new<I, S>(segments: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(TypeError::InvalidKey {
                key: String::new(),
                reason: "key must have at least one segment".into(),
            });
        }
        for segment in &segments {
            if segment.is_empty() {
                return Err(TypeError::InvalidKey {
                    key: segments.join("."),
                    reason: "segments must not be empty".into(),
                });
            }
            if segment.contains(SEPARATOR) {
                return Err(TypeError::InvalidKey {
                    key: segments.join("."),
                    reason: format!("segment {segment:?} contains the separator"),
                });
            }
        }
        Ok(Self { segments })
    }

    /// Parse the dotted textual form.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        if text.is_empty() {
            return Err(TypeError::InvalidKey {
                key: String::new(),
                reason: "key must not be empty".into(),
            });
        }
        Self::new(text.split(SEPARATOR))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments. Always at least one.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if `prefix`'s segments are a leading run of this key's
    /// segments. A key starts with itself.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Extend this key by one segment.
    pub fn child(&self, segment: &str) -> Result<Self, TypeError> {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self::new(segments)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl FromStr for Key {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}
