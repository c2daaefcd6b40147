//! Session repository.
//!
//! `SessionStore` over the `sessions` table. Field queries narrow by source
//! and type in SQL and match the field path against each stored document.

use serde_json::Value;

use session_core::entities::{NewSession, SessionData, SessionRecord};
use session_core::ids::PREFIX_SESSION;
use session_core::query::FieldPath;

use crate::SessionDb;
use crate::error::DatabaseError;
use crate::helpers::{
    checksum, format_datetime, is_unique_checksum_violation, now, parse_datetime, parse_json,
};
use crate::store::{InsertOutcome, SessionStore};

const SELECT_SESSION: &str =
    "SELECT id, source, type, data, created_at, updated_at FROM sessions";

/// A `sessions` row with its JSON parsed but not yet typed.
struct StoredRow {
    id: String,
    source: String,
    session_type: String,
    data: Value,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl StoredRow {
    fn from_row(row: &libsql::Row) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: row.get(0)?,
            source: row.get(1)?,
            session_type: row.get(2)?,
            data: parse_json(&row.get::<String>(3)?)?,
            created_at: parse_datetime(&row.get::<String>(4)?)?,
            updated_at: parse_datetime(&row.get::<String>(5)?)?,
        })
    }

    fn into_record(self) -> Result<SessionRecord, DatabaseError> {
        let data = SessionData::from_stored(&self.session_type, self.data, self.created_at)
            .map_err(|e| DatabaseError::InvalidState(format!("session {}: {e}", self.id)))?;
        Ok(SessionRecord {
            id: self.id,
            source: self.source,
            session_type: self.session_type,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn stored_text(data: &SessionData) -> Result<String, DatabaseError> {
    data.canonical_text()
        .map_err(|e| DatabaseError::InvalidState(e.to_string()))
}

async fn collect_rows(mut rows: libsql::Rows) -> Result<Vec<StoredRow>, DatabaseError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(StoredRow::from_row(&row)?);
    }
    Ok(out)
}

impl SessionDb {
    async fn find_by_checksum(
        &self,
        source: &str,
        session_type: &str,
        sum: &str,
    ) -> Result<Option<SessionRecord>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("{SELECT_SESSION} WHERE source = ?1 AND type = ?2 AND checksum = ?3"),
                libsql::params![source, session_type, sum],
            )
            .await?;
        collect_rows(rows)
            .await?
            .into_iter()
            .next()
            .map(StoredRow::into_record)
            .transpose()
    }

    async fn rows_for(
        &self,
        source: &str,
        session_type: &str,
    ) -> Result<Vec<StoredRow>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "{SELECT_SESSION} WHERE source = ?1 AND type = ?2 ORDER BY created_at, id"
                ),
                libsql::params![source, session_type],
            )
            .await?;
        collect_rows(rows).await
    }
}

impl SessionStore for SessionDb {
    async fn insert_if_absent(&self, session: NewSession) -> Result<InsertOutcome, DatabaseError> {
        let NewSession {
            source,
            session_type,
            mut data,
        } = session;

        let created = now();
        if let Some(study) = data.as_virtual_study_mut() {
            study.set_created(created);
        }
        let text = stored_text(&data)?;
        let sum = checksum(&text);
        let id = self.generate_id(PREFIX_SESSION).await?;
        let stamp = format_datetime(created);

        let inserted = self
            .conn()
            .execute(
                "INSERT INTO sessions (id, source, type, data, checksum, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                libsql::params![
                    id.as_str(),
                    source.as_str(),
                    session_type.as_str(),
                    text,
                    sum.as_str(),
                    stamp.as_str(),
                    stamp.as_str()
                ],
            )
            .await;

        match inserted {
            Ok(_) => Ok(InsertOutcome::Created(SessionRecord {
                id,
                source,
                session_type,
                data,
                created_at: created,
                updated_at: created,
            })),
            Err(e) if is_unique_checksum_violation(&e) => self
                .find_by_checksum(&source, &session_type, &sum)
                .await?
                .map(InsertOutcome::Existing)
                .ok_or(DatabaseError::NoResult),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_source_and_type(
        &self,
        source: &str,
        session_type: &str,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        self.rows_for(source, session_type)
            .await?
            .into_iter()
            .map(StoredRow::into_record)
            .collect()
    }

    async fn find_by_field(
        &self,
        source: &str,
        session_type: &str,
        field: &FieldPath,
        value: &str,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        self.rows_for(source, session_type)
            .await?
            .into_iter()
            .filter(|row| field.matches(&row.data, value))
            .map(StoredRow::into_record)
            .collect()
    }

    async fn find_one(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> Result<Option<SessionRecord>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("{SELECT_SESSION} WHERE id = ?1 AND source = ?2 AND type = ?3"),
                libsql::params![id, source, session_type],
            )
            .await?;
        collect_rows(rows)
            .await?
            .into_iter()
            .next()
            .map(StoredRow::into_record)
            .transpose()
    }

    async fn delete(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> Result<u64, DatabaseError> {
        Ok(self
            .conn()
            .execute(
                "DELETE FROM sessions WHERE id = ?1 AND source = ?2 AND type = ?3",
                libsql::params![id, source, session_type],
            )
            .await?)
    }

    async fn replace(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        let text = stored_text(&record.data)?;
        let sum = checksum(&text);
        let affected = self
            .conn()
            .execute(
                "UPDATE sessions SET data = ?1, checksum = ?2, updated_at = ?3
                 WHERE id = ?4 AND source = ?5 AND type = ?6",
                libsql::params![
                    text,
                    sum.as_str(),
                    format_datetime(now()),
                    record.id.as_str(),
                    record.source.as_str(),
                    record.session_type.as_str()
                ],
            )
            .await?;
        if affected == 0 {
            return Err(DatabaseError::NoResult);
        }
        Ok(())
    }
}
