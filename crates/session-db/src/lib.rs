//! # session-db
//!
//! libSQL storage for session documents and the lifecycle service on top.
//!
//! [`SessionDb`] owns the database handle and schema. It implements the
//! narrow [`store::SessionStore`] interface, which [`service::SessionService`]
//! consumes to provide add/get/query/update/delete semantics.
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29) in local mode.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod store;

mod test_support;

use error::DatabaseError;
use libsql::Builder;
use session_core::ids::ID_RANDOM_BYTES;

/// Database handle for session storage.
pub struct SessionDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl SessionDb {
    /// Open a local-only database at the given path. `":memory:"` opens a
    /// throwaway database.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let session_db = Self { db, conn };
        session_db.run_migrations().await?;
        tracing::debug!("opened session database at {path}");
        Ok(session_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL. Returns e.g. `"ses-3fa2...c1"` with
    /// 24 hex characters after the prefix.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT ?1 || '-' || lower(hex(randomblob({ID_RANDOM_BYTES})))"),
                [prefix],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_core::ids::{ALL_PREFIXES, PREFIX_SESSION, is_well_formed};
    use std::collections::HashSet;

    async fn test_db() -> SessionDb {
        SessionDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;

        for (kind, name) in [
            ("table", "sessions"),
            ("index", "idx_sessions_checksum"),
            ("index", "idx_sessions_source_type"),
        ] {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type = ?1 AND name = ?2",
                    [kind, name],
                )
                .await
                .unwrap();
            assert!(rows.next().await.unwrap().is_some(), "{kind} '{name}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_a_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let path = path.to_str().unwrap();

        {
            let db = SessionDb::open_local(path).await.unwrap();
            db.conn()
                .execute(
                    "INSERT INTO sessions (id, source, type, data, checksum) \
                     VALUES ('ses-1', 'portal', 'main_session', '{}', 'abc')",
                    (),
                )
                .await
                .unwrap();
        }

        let db = SessionDb::open_local(path).await.unwrap();
        let mut rows = db.conn().query("SELECT COUNT(*) FROM sessions", ()).await.unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn generate_id_format() {
        let db = test_db().await;
        let id = db.generate_id(PREFIX_SESSION).await.unwrap();
        assert!(id.starts_with("ses-"), "got {id}");
        assert_eq!(id.len(), 4 + ID_RANDOM_BYTES * 2);
        assert!(is_well_formed(&id, PREFIX_SESSION), "got {id}");
    }

    #[tokio::test]
    async fn generate_id_unique() {
        let db = test_db().await;
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = db.generate_id(PREFIX_SESSION).await.unwrap();
            assert!(ids.insert(id), "duplicate id generated");
        }
    }

    #[tokio::test]
    async fn generate_id_every_prefix() {
        let db = test_db().await;
        for prefix in ALL_PREFIXES {
            let id = db.generate_id(prefix).await.unwrap();
            assert!(is_well_formed(&id, prefix), "bad id for {prefix}: {id}");
        }
    }

    #[tokio::test]
    async fn unique_index_rejects_same_checksum_per_source_and_type() {
        let db = test_db().await;
        let insert = "INSERT INTO sessions (id, source, type, data, checksum) \
                      VALUES (?1, ?2, 'main_session', '{}', 'abc')";

        db.conn().execute(insert, ["ses-1", "portal"]).await.unwrap();
        db.conn().execute(insert, ["ses-2", "other"]).await.unwrap();
        let err = db.conn().execute(insert, ["ses-3", "portal"]).await.unwrap_err();
        assert!(helpers::is_unique_checksum_violation(&err), "{err}");
    }
}
