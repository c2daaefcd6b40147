//! Session lifecycle service.
//!
//! `SessionService` turns client requests into store calls: it parses and
//! validates documents, reconciles duplicate creates, resolves query fields
//! against the configured policy, and applies virtual-study merge updates.
//!
//! Merge updates are read-modify-write without a version check. Two
//! concurrent merges on the same record can lose one of the changes.

use serde_json::Value;

use session_core::entities::{NewSession, SessionData, SessionRecord};
use session_core::enums::OperationType;
use session_core::query::FieldPolicy;

use crate::SessionDb;
use crate::error::{DatabaseError, SessionError};
use crate::store::SessionStore;

/// Add/get/query/update/delete over session records.
pub struct SessionService<S = SessionDb> {
    store: S,
    fields: FieldPolicy,
}

impl SessionService<SessionDb> {
    /// Create a service over a local libSQL database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        Ok(Self::new(SessionDb::open_local(db_path).await?))
    }
}

impl<S: SessionStore> SessionService<S> {
    /// Wrap a store with an open field policy.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            fields: FieldPolicy::default(),
        }
    }

    /// Restrict which fields `get_sessions_by_query` accepts.
    #[must_use]
    pub fn with_field_policy(mut self, fields: FieldPolicy) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn field_policy(&self) -> &FieldPolicy {
        &self.fields
    }

    /// Create a session, or return the stored one with identical content.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidDocument` if `data` is not valid session
    /// data for `session_type`.
    pub async fn add_session(
        &self,
        source: &str,
        session_type: &str,
        data: &str,
    ) -> Result<SessionRecord, SessionError> {
        tracing::debug!(source, session_type, "adding session");
        let candidate = NewSession::parse(source, session_type, data)?;

        let outcome = self.store.insert_if_absent(candidate).await?;
        let created = outcome.is_created();
        let record = outcome.into_record();
        if created {
            tracing::info!(source, session_type, id = %record.id, "created session");
        } else {
            tracing::info!(source, session_type, id = %record.id, "returning existing session");
        }
        Ok(record)
    }

    /// All sessions for a source and type, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Database` on a store fault.
    pub async fn get_sessions(
        &self,
        source: &str,
        session_type: &str,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        tracing::debug!(source, session_type, "listing sessions");
        Ok(self.store.find_by_source_and_type(source, session_type).await?)
    }

    /// Sessions whose data holds `value` at the dotted path `field`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidQuery` if `field` is malformed or not
    /// permitted.
    pub async fn get_sessions_by_query(
        &self,
        source: &str,
        session_type: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<SessionRecord>, SessionError> {
        tracing::debug!(source, session_type, field, "querying sessions");
        let path = self.fields.resolve(field).inspect_err(|e| {
            tracing::warn!(source, session_type, field, "rejected query field: {e}");
        })?;
        Ok(self
            .store
            .find_by_field(source, session_type, &path, value)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if no session matches all three keys.
    pub async fn get_session(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> Result<SessionRecord, SessionError> {
        tracing::debug!(source, session_type, id, "getting session");
        self.store
            .find_one(source, session_type, id)
            .await?
            .ok_or_else(|| SessionError::not_found(id))
    }

    /// Update a session's data.
    ///
    /// With an `operation` on a virtual study, `data` names one user to add
    /// to or remove from its `users`. Otherwise `data` replaces the stored
    /// document in full.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the session does not exist and
    /// `SessionError::InvalidDocument` if `data` is unusable.
    pub async fn update_session(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
        data: &str,
        operation: Option<OperationType>,
    ) -> Result<(), SessionError> {
        tracing::debug!(source, session_type, id, ?operation, "updating session");
        let mut record = self.get_session(source, session_type, id).await?;

        if let (Some(operation), Some(study)) = (operation, record.data.as_virtual_study_mut()) {
            let user = merge_user(data)?;
            let changed = study.apply(operation, &user);
            tracing::info!(id, %operation, user = %user, changed, "merged virtual study users");
        } else {
            let replacement = SessionData::parse(&record.session_type, data)?;
            record.replace_data(replacement);
            tracing::info!(id, "replaced session data");
        }

        self.store.replace(&record).await.map_err(|e| match e {
            DatabaseError::NoResult => SessionError::not_found(id),
            other => other.into(),
        })
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if nothing was deleted.
    pub async fn delete_session(
        &self,
        source: &str,
        session_type: &str,
        id: &str,
    ) -> Result<(), SessionError> {
        tracing::debug!(source, session_type, id, "deleting session");
        if self.store.delete(source, session_type, id).await? == 0 {
            return Err(SessionError::not_found(id));
        }
        tracing::info!(source, session_type, id, "deleted session");
        Ok(())
    }
}

/// The user id carried by a merge update: a JSON string literal is unquoted,
/// anything else is taken as trimmed text.
fn merge_user(data: &str) -> Result<String, SessionError> {
    let user = match serde_json::from_str::<Value>(data) {
        Ok(Value::String(user)) => user,
        _ => data.to_string(),
    };
    let user = user.trim();
    if user.is_empty() {
        return Err(SessionError::InvalidDocument(
            "user id may not be empty".into(),
        ));
    }
    Ok(user.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use session_core::entities::VIRTUAL_STUDY_TYPE;

    use super::*;
    use crate::test_support::helpers::{STUDY_JSON, test_service};

    fn users(record: &SessionRecord) -> BTreeSet<String> {
        record.data.as_virtual_study().unwrap().users().clone()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case("bob", "bob")]
    #[case("  bob \n", "bob")]
    #[case(r#""bob""#, "bob")]
    #[case(r#"" bob ""#, "bob")]
    #[case("42", "42")]
    fn merge_user_accepts_plain_and_quoted_ids(#[case] data: &str, #[case] expected: &str) {
        assert_eq!(merge_user(data).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(r#""""#)]
    fn merge_user_rejects_empty_ids(#[case] data: &str) {
        assert!(matches!(merge_user(data), Err(SessionError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn merge_adds_and_removes_users() {
        let svc = test_service().await;
        let record = svc
            .add_session("portal", VIRTUAL_STUDY_TYPE, STUDY_JSON)
            .await
            .unwrap();
        assert_eq!(users(&record), set(&["alice"]));

        svc.update_session(
            "portal",
            VIRTUAL_STUDY_TYPE,
            &record.id,
            "bob",
            Some(OperationType::AddUser),
        )
        .await
        .unwrap();
        let after_add = svc.get_session("portal", VIRTUAL_STUDY_TYPE, &record.id).await.unwrap();
        assert_eq!(users(&after_add), set(&["alice", "bob"]));

        svc.update_session(
            "portal",
            VIRTUAL_STUDY_TYPE,
            &record.id,
            "alice",
            Some(OperationType::RemoveUser),
        )
        .await
        .unwrap();
        let after_remove = svc.get_session("portal", VIRTUAL_STUDY_TYPE, &record.id).await.unwrap();
        assert_eq!(users(&after_remove), set(&["bob"]));

        // Owner and every other field are untouched.
        let study = after_remove.data.as_virtual_study().unwrap();
        let original = record.data.as_virtual_study().unwrap();
        assert_eq!(study.owner(), "alice");
        assert_eq!(study.name, original.name);
        assert_eq!(study.studies, original.studies);
        assert_eq!(study.filters, original.filters);
        assert_eq!(study.created(), original.created());
    }

    #[tokio::test]
    async fn removing_a_non_member_is_a_no_op() {
        let svc = test_service().await;
        let record = svc
            .add_session("portal", VIRTUAL_STUDY_TYPE, STUDY_JSON)
            .await
            .unwrap();

        svc.update_session(
            "portal",
            VIRTUAL_STUDY_TYPE,
            &record.id,
            "carol",
            Some(OperationType::RemoveUser),
        )
        .await
        .unwrap();
        let after = svc.get_session("portal", VIRTUAL_STUDY_TYPE, &record.id).await.unwrap();
        assert_eq!(after.data, record.data);
    }

    #[tokio::test]
    async fn operation_on_plain_document_replaces_it() {
        let svc = test_service().await;
        let record = svc
            .add_session("portal", "main_session", r#"{"a": 1}"#)
            .await
            .unwrap();

        svc.update_session(
            "portal",
            "main_session",
            &record.id,
            r#"{"b": 2}"#,
            Some(OperationType::AddUser),
        )
        .await
        .unwrap();
        let after = svc.get_session("portal", "main_session", &record.id).await.unwrap();
        assert_eq!(after.data, SessionData::Document(json!({"b": 2})));
    }

    #[tokio::test]
    async fn merge_with_empty_user_is_invalid() {
        let svc = test_service().await;
        let record = svc
            .add_session("portal", VIRTUAL_STUDY_TYPE, STUDY_JSON)
            .await
            .unwrap();

        let err = svc
            .update_session(
                "portal",
                VIRTUAL_STUDY_TYPE,
                &record.id,
                " ",
                Some(OperationType::AddUser),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidDocument(_)), "{err}");
    }

    #[tokio::test]
    async fn restricted_policy_rejects_unlisted_fields() {
        let policy = FieldPolicy::new(&["users"], 4).unwrap();
        let svc = test_service().await.with_field_policy(policy);
        svc.add_session("portal", VIRTUAL_STUDY_TYPE, STUDY_JSON)
            .await
            .unwrap();

        let hits = svc
            .get_sessions_by_query("portal", VIRTUAL_STUDY_TYPE, "data.users", "alice")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let err = svc
            .get_sessions_by_query("portal", VIRTUAL_STUDY_TYPE, "owner", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)), "{err}");
    }
}
