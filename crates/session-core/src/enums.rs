//! Update operations for session documents.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// OperationType
// ---------------------------------------------------------------------------

/// A merge operation against the `users` set of a virtual study.
///
/// Without an operation an update is a full replace of the session data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    AddUser,
    RemoveUser,
}

impl OperationType {
    /// Return the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddUser => "add_user",
            Self::RemoveUser => "remove_user",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = CoreError;

    /// Case-insensitive, so `add_user` and `ADD_USER` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add_user" => Ok(Self::AddUser),
            "remove_user" => Ok(Self::RemoveUser),
            _ => Err(CoreError::UnknownOperation(s.to_string())),
        }
    }
}
