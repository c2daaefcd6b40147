//! Error types for session-db.

use session_core::errors::CoreError;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),
}

/// Errors from session lifecycle operations.
///
/// The first three variants are client errors; `Database` is a store fault.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session document: {0}")]
    InvalidDocument(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Session not found: {id}")]
    NotFound { id: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl SessionError {
    /// Short machine-readable name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidDocument(_) => "invalid_document",
            Self::InvalidQuery(_) => "invalid_query",
            Self::NotFound { .. } => "not_found",
            Self::Database(_) => "internal",
        }
    }

    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }
}

impl From<CoreError> for SessionError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidDocument(msg) => Self::InvalidDocument(msg),
            CoreError::InvalidQuery(msg) => Self::InvalidQuery(msg),
            e @ CoreError::UnknownOperation(_) => Self::InvalidDocument(e.to_string()),
        }
    }
}
