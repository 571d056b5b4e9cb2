//! Key paths for addressing values inside a form model.
//!
//! A field key such as `address.city` or `o[0].0.name` is parsed once into a
//! [`KeyPath`], an ordered list of segments. Segments made only of ASCII
//! digits address array elements; every other segment addresses an object
//! member.
//!
//! # Usage
//!
//! ```rust
//! use formsync::path::{KeyPath, get_value, set_value};
//! use serde_json::json;
//!
//! let path = KeyPath::parse("o[0].0.name")?;
//! assert_eq!(path.segments(), ["o", "0", "0", "name"]);
//!
//! let mut model = json!({});
//! set_value(&mut model, path.segments(), json!("***"));
//! assert_eq!(model, json!({ "o": [[{ "name": "***" }]] }));
//! assert_eq!(get_value(&model, path.segments()), Some(&json!("***")));
//! # Ok::<(), formsync::path::PathError>(())
//! ```

use std::{fmt, str::FromStr};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::MAX_KEY_INDEX;

/// Error type for key parsing failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The key is empty.
    #[error("Empty key")]
    EmptyKey,

    /// The key contains an empty segment, e.g. `a..b` or a trailing dot.
    #[error("Invalid key '{key}': empty segment at position {position}")]
    EmptySegment { key: String, position: usize },

    /// A bracket expression is malformed.
    #[error("Invalid key '{key}': {reason}")]
    InvalidBracket { key: String, reason: String },

    /// An index segment is larger than [`MAX_KEY_INDEX`].
    #[error("Invalid key '{key}': index {index} exceeds {max}")]
    IndexTooLarge {
        key: String,
        index: String,
        max: usize,
    },
}

impl PathError {
    /// The offending key, if the error carries one.
    pub fn key(&self) -> Option<&str> {
        match self {
            PathError::EmptyKey => None,
            PathError::EmptySegment { key, .. }
            | PathError::InvalidBracket { key, .. }
            | PathError::IndexTooLarge { key, .. } => Some(key),
        }
    }
}

impl From<PathError> for crate::Error {
    fn from(err: PathError) -> Self {
        crate::Error::Path(err)
    }
}

/// Returns true when a segment addresses an array element.
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// An owned, parsed key path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Creates an empty path, which addresses the model itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a field key using dot and bracket notation.
    ///
    /// # Errors
    /// Returns a [`PathError`] for empty keys, empty segments, malformed
    /// bracket expressions and indices above [`MAX_KEY_INDEX`].
    pub fn parse(key: &str) -> Result<Self, PathError> {
        if key.is_empty() {
            return Err(PathError::EmptyKey);
        }

        let mut segments = Vec::new();
        for (position, part) in key.split('.').enumerate() {
            if part.is_empty() {
                return Err(PathError::EmptySegment {
                    key: key.to_string(),
                    position,
                });
            }
            parse_segment(key, part, &mut segments)?;
        }

        Ok(Self { segments })
    }

    /// Builds a path from already split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns a new path with `other` appended.
    pub fn join(&self, other: &KeyPath) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        KeyPath { segments }
    }

    /// Appends one segment.
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Returns true if `self` starts with every segment of `prefix`.
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

fn parse_segment(key: &str, part: &str, out: &mut Vec<String>) -> Result<(), PathError> {
    let invalid = |reason: &str| PathError::InvalidBracket {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let Some(open) = part.find('[') else {
        if part.contains(']') {
            return Err(invalid("unmatched ']'"));
        }
        check_index(key, part)?;
        out.push(part.to_string());
        return Ok(());
    };

    if open > 0 {
        out.push(part[..open].to_string());
    }

    let mut rest = &part[open..];
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('[') else {
            return Err(invalid("unexpected text after ']'"));
        };
        let Some(close) = inner.find(']') else {
            return Err(invalid("unclosed '['"));
        };
        let index = &inner[..close];
        if !is_index(index) {
            return Err(invalid("bracket index must be a non-negative integer"));
        }
        check_index(key, index)?;
        out.push(index.to_string());
        rest = &inner[close + 1..];
    }

    Ok(())
}

/// Rejects index segments that would pad an array past [`MAX_KEY_INDEX`].
fn check_index(key: &str, segment: &str) -> Result<(), PathError> {
    if !is_index(segment) {
        return Ok(());
    }
    match segment.parse::<usize>() {
        Ok(index) if index <= MAX_KEY_INDEX => Ok(()),
        _ => Err(PathError::IndexTooLarge {
            key: key.to_string(),
            index: segment.to_string(),
            max: MAX_KEY_INDEX,
        }),
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPath::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Reads the value at `path`, or `None` when any container is missing.
pub fn get_value<'a>(model: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(model, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) if is_index(segment) => {
            segment.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    })
}

/// Mutable counterpart of [`get_value`].
pub fn get_value_mut<'a>(model: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter().try_fold(model, |current, segment| match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) if is_index(segment) => {
            segment.parse::<usize>().ok().and_then(|i| items.get_mut(i))
        }
        _ => None,
    })
}

/// Writes `value` at `path`, creating intermediate containers on the way.
///
/// A missing or non-container intermediate becomes an array when the next
/// segment is numeric, otherwise an object. Writing past the end of an array
/// pads it with `null`. An empty path replaces the model.
pub fn set_value(model: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *model = value;
        return;
    };

    let mut current = model;
    for (i, segment) in parents.iter().enumerate() {
        ensure_container(current, segment);
        let next_is_index = is_index(&path[i + 1]);
        let slot = child_slot({ current }, segment);
        let keep = match slot {
            Value::Array(_) => next_is_index,
            Value::Object(_) => true,
            _ => false,
        };
        if !keep {
            *slot = empty_container(next_is_index);
        }
        current = slot;
    }

    ensure_container(current, last);
    *child_slot(current, last) = value;
}

/// Removes the value at `path` without creating anything.
///
/// Array elements are replaced by `null` so sibling indices stay stable.
pub fn remove_value(model: &mut Value, path: &[String]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = model;
    for segment in parents {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let slot = items.get_mut(last.parse::<usize>().ok()?)?;
            Some(std::mem::replace(slot, Value::Null))
        }
        _ => None,
    }
}

fn empty_container(array: bool) -> Value {
    if array {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// Makes `current` able to hold `segment`.
fn ensure_container(current: &mut Value, segment: &str) {
    let fits = match current {
        Value::Object(_) => true,
        Value::Array(_) => is_index(segment),
        _ => false,
    };
    if !fits {
        *current = empty_container(is_index(segment));
    }
}

/// Returns the slot for `segment`, inserting `null` when absent.
///
/// `current` must already be a container that fits `segment`.
fn child_slot<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    match current {
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        Value::Array(items) => {
            let index = segment.parse::<usize>().unwrap_or(items.len());
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        _ => unreachable!("ensure_container guarantees a container"),
    }
}
