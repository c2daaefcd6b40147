//! The storage interface consumed by the lifecycle service.

use std::future::Future;

use session_core::entities::{NewSession, SessionRecord};
use session_core::query::FieldPath;

use crate::error::DatabaseError;

/// Result of an insert that tolerates identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Created(SessionRecord),
    /// A row with the same source, type and content already existed.
    Existing(SessionRecord),
}

impl InsertOutcome {
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    #[must_use]
    pub fn into_record(self) -> SessionRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }
}

/// Document store operations the lifecycle service needs.
///
/// Implementations must enforce uniqueness of (source, type, data) on insert
/// atomically, so concurrent identical inserts converge on one record.
pub trait SessionStore: Send + Sync {
    /// Insert `session` unless identical content already exists for its
    /// source and type.
    fn insert_if_absent(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<InsertOutcome, DatabaseError>> + Send;

    /// All records for a source and type, oldest first.
    fn find_by_source_and_type(
        &self,
        source: &str,
        session_type: &str,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, DatabaseError>> + Send;

    /// Records whose stored data holds `value` at `field`, oldest first.
    fn find_by_field(
        &self,
        source: &str,
        session_type: &str,
        field: &FieldPath,
        value: &str,
    ) -> impl Future<Output = Result<Vec<SessionRecord>, DatabaseError>> + Send;

    fn find_one(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<SessionRecord>, DatabaseError>> + Send;

    /// Delete by all three keys. Returns the number of rows removed.
    fn delete(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<u64, DatabaseError>> + Send;

    /// Overwrite the stored data of an existing record.
    ///
    /// Returns `DatabaseError::NoResult` if the record no longer exists.
    fn replace(
        &self,
        record: &SessionRecord,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;
}
