//! Cross-cutting error types for the session service.
//!
//! Storage errors (`DatabaseError`) and the lifecycle error surfaced to the
//! HTTP boundary (`SessionError`) live in `session-db`.

use thiserror::Error;

/// Errors raised while parsing or validating session content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Session data is not valid JSON or violates field constraints.
    #[error("Invalid session document: {0}")]
    InvalidDocument(String),

    /// A query field path is malformed or not permitted.
    #[error("Invalid session query: {0}")]
    InvalidQuery(String),

    /// An update operation name did not match any known operation.
    #[error("Unknown update operation: {0}")]
    UnknownOperation(String),
}
