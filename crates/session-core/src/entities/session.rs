use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::virtual_study::{VIRTUAL_STUDY_TYPE, VirtualStudy};
use crate::errors::CoreError;

/// The `data` of a session, dispatched on the session type.
///
/// Serializes as the public view: the plain document, or the virtual study
/// without its bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SessionData {
    VirtualStudy(VirtualStudy),
    Document(Value),
}

impl SessionData {
    /// Parse raw client text for a session of `session_type`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDocument` if the text is empty, is not JSON,
    /// or does not satisfy the shape required by the session type.
    pub fn parse(session_type: &str, raw: &str) -> Result<Self, CoreError> {
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidDocument("session data is empty".into()));
        }
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            CoreError::InvalidDocument(format!("session data is not valid JSON: {e}"))
        })?;
        Self::from_document(session_type, value)
    }

    /// Validate an already-parsed client document.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDocument` if a virtual study is missing
    /// required fields or a generic document is not a JSON object.
    pub fn from_document(session_type: &str, value: Value) -> Result<Self, CoreError> {
        if session_type == VIRTUAL_STUDY_TYPE {
            return VirtualStudy::from_document(&value).map(Self::VirtualStudy);
        }
        if !value.is_object() {
            return Err(CoreError::InvalidDocument(
                "session data must be a JSON object".into(),
            ));
        }
        Ok(Self::Document(value))
    }

    /// Rebuild from the stored JSON of a session row.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDocument` if a stored virtual study no longer
    /// has the expected shape.
    pub fn from_stored(
        session_type: &str,
        value: Value,
        created: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        if session_type == VIRTUAL_STUDY_TYPE {
            return VirtualStudy::from_stored(&value, created).map(Self::VirtualStudy);
        }
        Ok(Self::Document(value))
    }

    /// JSON persisted by the store, including derived fields.
    ///
    /// # Errors
    ///
    /// See [`VirtualStudy::to_stored_value`].
    pub fn to_stored_value(&self) -> Result<Value, CoreError> {
        match self {
            Self::VirtualStudy(study) => study.to_stored_value(),
            Self::Document(value) => Ok(value.clone()),
        }
    }

    /// Stored JSON as text with object keys sorted at every level.
    ///
    /// Equal documents always produce equal text, which is what the store's
    /// uniqueness index compares.
    ///
    /// # Errors
    ///
    /// See [`VirtualStudy::to_stored_value`].
    pub fn canonical_text(&self) -> Result<String, CoreError> {
        Ok(canonicalize(&self.to_stored_value()?).to_string())
    }

    #[must_use]
    pub const fn as_virtual_study(&self) -> Option<&VirtualStudy> {
        match self {
            Self::VirtualStudy(study) => Some(study),
            Self::Document(_) => None,
        }
    }

    pub const fn as_virtual_study_mut(&mut self) -> Option<&mut VirtualStudy> {
        match self {
            Self::VirtualStudy(study) => Some(study),
            Self::Document(_) => None,
        }
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// A candidate session that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub source: String,
    pub session_type: String,
    pub data: SessionData,
}

impl NewSession {
    /// Build a candidate from raw client text.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDocument` if `raw` is not valid session data.
    pub fn parse(source: &str, session_type: &str, raw: &str) -> Result<Self, CoreError> {
        Ok(Self {
            source: source.to_string(),
            session_type: session_type.to_string(),
            data: SessionData::parse(session_type, raw)?,
        })
    }
}

/// One stored session document with its metadata.
///
/// Serializes as `{"id": ..., "data": {...}}`. `source`, `session_type` and
/// the timestamps are addressed through the request path or read directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(skip)]
    pub source: String,
    #[serde(skip)]
    pub session_type: String,
    pub data: SessionData,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Overwrite `data` in full. A virtual study keeps the record's creation time.
    pub fn replace_data(&mut self, mut data: SessionData) {
        if let Some(study) = data.as_virtual_study_mut() {
            study.set_created(self.created_at);
        }
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    const STUDY: &str = r#"{
        "name": "cohort",
        "description": "d",
        "studies": [{"id": "acc_tcga"}],
        "origin": ["acc_tcga"],
        "owner": "alice"
    }"#;

    #[test]
    fn type_selects_the_variant() {
        let study = SessionData::parse(VIRTUAL_STUDY_TYPE, STUDY).unwrap();
        assert!(study.as_virtual_study().is_some());

        let document = SessionData::parse("main_session", STUDY).unwrap();
        assert!(document.as_virtual_study().is_none());
    }

    #[test]
    fn empty_object_is_a_valid_document() {
        let data = SessionData::parse("main_session", "{}").unwrap();
        assert_eq!(data, SessionData::Document(json!({})));
    }

    #[test]
    fn rejects_unparseable_and_non_object_data() {
        for raw in ["", "   ", r#"{"portal-session":blah blah blah}"#] {
            let err = SessionData::parse("main_session", raw).unwrap_err();
            assert!(matches!(err, CoreError::InvalidDocument(_)), "{raw:?}");
        }
        let err = SessionData::parse("main_session", "[1, 2]").unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidDocument("session data must be a JSON object".into())
        );
    }

    #[test]
    fn canonical_text_ignores_key_order() {
        let a = SessionData::parse("main_session", r#"{"b": 1, "a": {"y": 2, "x": 3}}"#).unwrap();
        let b = SessionData::parse("main_session", r#"{"a": {"x": 3, "y": 2}, "b": 1}"#).unwrap();
        assert_eq!(a.canonical_text().unwrap(), b.canonical_text().unwrap());
        assert_eq!(a.canonical_text().unwrap(), r#"{"a":{"x":3,"y":2},"b":1}"#);
    }

    #[test]
    fn stored_study_text_is_never_null() {
        let data = SessionData::parse(VIRTUAL_STUDY_TYPE, STUDY).unwrap();
        let text = data.canonical_text().unwrap();
        assert_ne!(text, "null");
        let stored: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(stored["users"], json!(["alice"]));
        assert_eq!(stored["owner"], json!("alice"));
    }

    #[test]
    fn record_serializes_id_and_public_data_only() {
        let now = Utc::now();
        let record = SessionRecord {
            id: "ses-1".into(),
            source: "portal".into(),
            session_type: VIRTUAL_STUDY_TYPE.into(),
            data: SessionData::parse(VIRTUAL_STUDY_TYPE, STUDY).unwrap(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
        assert_eq!(json["id"], json!("ses-1"));
        assert_eq!(json["data"]["owner"], json!("alice"));
        assert!(json["data"].get("users").is_none());
    }

    #[test]
    fn replace_data_keeps_creation_time() {
        let created = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut record = SessionRecord {
            id: "ses-1".into(),
            source: "portal".into(),
            session_type: VIRTUAL_STUDY_TYPE.into(),
            data: SessionData::parse(VIRTUAL_STUDY_TYPE, STUDY).unwrap(),
            created_at: created,
            updated_at: created,
        };
        record.replace_data(SessionData::parse(VIRTUAL_STUDY_TYPE, STUDY).unwrap());
        assert_eq!(record.data.as_virtual_study().unwrap().created(), created);
    }
}
