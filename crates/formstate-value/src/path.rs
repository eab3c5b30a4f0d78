//! Field names and the paths they address.
//!
//! A field name is split on `.` into mapping keys. A key that itself contains
//! a dot is written with a backslash escape: `"sizes.eu\.42"` addresses the
//! key `eu.42` inside `sizes`. `\\` is a literal backslash. Any other escape
//! is rejected so that names stay unambiguous.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{PathError, Result};

const SEPARATOR: char = '.';
const ESCAPE: char = '\\';

/// A parsed, non-empty sequence of mapping keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dot-separated field name.
    ///
    /// # Errors
    ///
    /// Returns an error for empty names, empty segments and bad escapes.
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = name.chars();
        while let Some(ch) = chars.next() {
            match ch {
                ESCAPE => match chars.next() {
                    Some(escaped @ (SEPARATOR | ESCAPE)) => current.push(escaped),
                    Some(found) => {
                        return Err(PathError::InvalidEscape {
                            name: name.to_owned(),
                            found,
                        });
                    }
                    None => {
                        return Err(PathError::DanglingEscape {
                            name: name.to_owned(),
                        });
                    }
                },
                SEPARATOR => {
                    if current.is_empty() {
                        return Err(PathError::EmptySegment {
                            name: name.to_owned(),
                            position: segments.len(),
                        });
                    }
                    segments.push(std::mem::take(&mut current));
                }
                other => current.push(other),
            }
        }

        if current.is_empty() {
            return Err(PathError::EmptySegment {
                name: name.to_owned(),
                position: segments.len(),
            });
        }
        segments.push(current);
        Ok(Self(segments))
    }

    /// Treat the whole name as one flat key, dots included.
    pub fn literal(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(vec![name.to_owned()]))
    }

    /// Parse `name` as nested when `nested` is set, otherwise as a flat key.
    pub fn resolve(name: &str, nested: bool) -> Result<Self> {
        if nested {
            Self::parse(name)
        } else {
            Self::literal(name)
        }
    }

    /// Build a path from raw (unescaped) keys.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if let Some(position) = segments.iter().position(String::is_empty) {
            return Err(PathError::EmptySegment {
                name: segments.join("."),
                position,
            });
        }
        Ok(Self(segments))
    }

    /// Single-segment path for a key already known to be non-empty.
    pub(crate) fn key(key: &str) -> Self {
        Self(vec![key.to_owned()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments (always at least one).
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The top-level key.
    pub fn root_key(&self) -> &str {
        self.0.first().map_or("", String::as_str)
    }

    /// The leaf key and the keys leading to it.
    pub fn split_last(&self) -> (&str, &[String]) {
        match self.0.split_last() {
            Some((leaf, parents)) => (leaf.as_str(), parents),
            None => ("", &[]),
        }
    }

    /// This path extended by one key.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_owned());
        Self(segments)
    }

    /// Escape a raw key so it survives a round trip through [`FieldPath::parse`].
    pub fn escape_segment(segment: &str) -> Cow<'_, str> {
        if !segment.contains([SEPARATOR, ESCAPE]) {
            return Cow::Borrowed(segment);
        }
        let mut escaped = String::with_capacity(segment.len() + 2);
        for ch in segment.chars() {
            if ch == SEPARATOR || ch == ESCAPE {
                escaped.push(ESCAPE);
            }
            escaped.push(ch);
        }
        Cow::Owned(escaped)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            f.write_str(&Self::escape_segment(segment))?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
