//! Field paths for query-by-field lookups.
//!
//! A client names one field inside session data with a dotted path such as
//! `filters.samples.CANCER_TYPE` or `users`. A leading `data.` is accepted
//! and stripped, so paths written against the whole record work too.
//!
//! Matching follows document-database conventions: arrays met along the path
//! are traversed element-wise (a numeric segment indexes into the array
//! instead), and an array-valued leaf matches when any element equals the
//! queried value.

use std::fmt;

use serde_json::Value;

use crate::errors::CoreError;

/// Default maximum number of segments in a field path.
pub const MAX_FIELD_DEPTH: usize = 8;

const RECORD_DATA_PREFIX: &str = "data";

/// A validated dotted path into session data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse with the default depth limit.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidQuery` if the path is empty, too deep, or
    /// contains a segment outside `[A-Za-z0-9_-]+`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        Self::parse_with_depth(raw, MAX_FIELD_DEPTH)
    }

    /// Parse with an explicit depth limit.
    ///
    /// # Errors
    ///
    /// See [`FieldPath::parse`].
    pub fn parse_with_depth(raw: &str, max_depth: usize) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidQuery("query field must not be empty".into()));
        }

        let mut segments: Vec<&str> = trimmed.split('.').collect();
        if segments.len() > 1 && segments[0] == RECORD_DATA_PREFIX {
            segments.remove(0);
        }

        if segments.len() > max_depth {
            return Err(CoreError::InvalidQuery(format!(
                "query field '{raw}' is deeper than {max_depth} segments"
            )));
        }
        if let Some(bad) = segments.iter().find(|s| !is_valid_segment(s)) {
            return Err(CoreError::InvalidQuery(format!(
                "query field '{raw}' has invalid segment '{bad}'"
            )));
        }

        Ok(Self {
            segments: segments.into_iter().map(String::from).collect(),
        })
    }

    /// Whether `document` holds `value` at this path.
    #[must_use]
    pub fn matches(&self, document: &Value, value: &str) -> bool {
        let mut leaves = Vec::new();
        collect_leaves(document, &self.segments, &mut leaves);
        leaves.into_iter().any(|leaf| leaf_matches(leaf, value))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn collect_leaves<'a>(current: &'a Value, segments: &[String], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(current);
        return;
    };
    match current {
        Value::Object(map) => {
            if let Some(next) = map.get(head) {
                collect_leaves(next, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    collect_leaves(item, rest, out);
                }
            } else {
                for item in items {
                    collect_leaves(item, segments, out);
                }
            }
        }
        _ => {}
    }
}

fn leaf_matches(leaf: &Value, value: &str) -> bool {
    match leaf {
        Value::String(s) => s == value,
        Value::Number(n) => n.to_string() == value,
        Value::Bool(b) => b.to_string() == value,
        Value::Array(items) => items.iter().any(|item| !item.is_array() && leaf_matches(item, value)),
        Value::Null | Value::Object(_) => false,
    }
}

/// Which field paths clients may query.
///
/// An empty allow-list permits any structurally valid path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPolicy {
    allowed: Vec<FieldPath>,
    max_depth: usize,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self {
            allowed: Vec::new(),
            max_depth: MAX_FIELD_DEPTH,
        }
    }
}

impl FieldPolicy {
    /// Build a policy from configured paths.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidQuery` if a configured path is itself invalid.
    pub fn new<S: AsRef<str>>(allowed: &[S], max_depth: usize) -> Result<Self, CoreError> {
        let allowed = allowed
            .iter()
            .map(|raw| FieldPath::parse_with_depth(raw.as_ref(), max_depth))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { allowed, max_depth })
    }

    #[must_use]
    pub fn is_restricted(&self) -> bool {
        !self.allowed.is_empty()
    }

    /// Parse `raw` and check it against the allow-list.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidQuery` if the path is malformed or not allowed.
    pub fn resolve(&self, raw: &str) -> Result<FieldPath, CoreError> {
        let path = FieldPath::parse_with_depth(raw, self.max_depth)?;
        if self.is_restricted() && !self.allowed.contains(&path) {
            return Err(CoreError::InvalidQuery(format!(
                "query field '{path}' is not permitted"
            )));
        }
        Ok(path)
    }
}
