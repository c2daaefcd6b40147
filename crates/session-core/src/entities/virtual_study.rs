use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::OperationType;
use crate::errors::CoreError;

/// Session type whose data is parsed as a [`VirtualStudy`].
pub const VIRTUAL_STUDY_TYPE: &str = "virtual_study";

/// Owner assigned when a virtual study names none. Anonymous studies have no users.
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Filter values keyed by clinical attribute. All values are treated as strings.
pub type FilterMap = BTreeMap<String, BTreeSet<String>>;

/// One study in a virtual study, optionally narrowed to a subset of samples.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct StudyRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<BTreeSet<String>>,
}

/// Patient and sample filters applied when the virtual study was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AppliedFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patients: Option<FilterMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<FilterMap>,
}

/// A curated set of studies and samples shared with a set of users.
///
/// `users` is a function of `owner`: empty for [`ANONYMOUS_OWNER`], otherwise
/// `{owner}`. It is recomputed by [`set_owner`](Self::set_owner) and only
/// changes otherwise through [`apply`](Self::apply).
///
/// The derived `Serialize` is the public view: `users` and `created` are
/// bookkeeping and stay out of it. The stored view, which keeps `users`, is
/// produced by [`to_stored_value`](Self::to_stored_value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct VirtualStudy {
    pub name: String,
    pub description: String,
    pub studies: BTreeSet<StudyRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<AppliedFilters>,
    owner: String,
    pub origin: BTreeSet<String>,
    #[serde(skip)]
    users: BTreeSet<String>,
    #[serde(skip)]
    created: DateTime<Utc>,
}

/// Client input. `users` and `created` are not declared and therefore ignored.
#[derive(Deserialize)]
struct VirtualStudyDraft {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    studies: Option<Vec<StudyDraft>>,
    #[serde(default)]
    filters: Option<AppliedFilters>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    origin: Option<BTreeSet<String>>,
}

#[derive(Deserialize)]
struct StudyDraft {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    samples: Option<BTreeSet<String>>,
}

/// Stored form read back from the database.
#[derive(Deserialize)]
struct StoredVirtualStudy {
    name: String,
    description: String,
    studies: BTreeSet<StudyRef>,
    #[serde(default)]
    filters: Option<AppliedFilters>,
    owner: String,
    origin: BTreeSet<String>,
    #[serde(default)]
    users: BTreeSet<String>,
}

/// Stored form written to the database. Sets are sorted, so equal studies
/// always produce identical text.
#[derive(Serialize)]
struct StoredVirtualStudyRef<'a> {
    name: &'a str,
    description: &'a str,
    studies: &'a BTreeSet<StudyRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a AppliedFilters>,
    owner: &'a str,
    origin: &'a BTreeSet<String>,
    users: &'a BTreeSet<String>,
}

impl VirtualStudy {
    /// Create an anonymous virtual study.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        studies: BTreeSet<StudyRef>,
        origin: BTreeSet<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            studies,
            filters: None,
            owner: ANONYMOUS_OWNER.to_string(),
            origin,
            users: BTreeSet::new(),
            created: Utc::now(),
        }
    }

    /// Parse and validate client-supplied JSON.
    ///
    /// Every missing required field is reported, joined into one message.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDocument` if the JSON has the wrong shape or
    /// any required field is missing.
    pub fn from_document(value: &Value) -> Result<Self, CoreError> {
        let draft = VirtualStudyDraft::deserialize(value)
            .map_err(|e| CoreError::InvalidDocument(e.to_string()))?;

        let mut violations = Vec::new();
        if draft.name.is_none() {
            violations.push("name may not be null");
        }
        if draft.description.is_none() {
            violations.push("description may not be null");
        }
        match &draft.studies {
            None => violations.push("studies may not be null"),
            Some(studies) if studies.iter().any(|s| s.id.is_none()) => {
                violations.push("studies.id may not be null");
            }
            Some(_) => {}
        }
        if draft.origin.is_none() {
            violations.push("origin may not be null");
        }

        let (Some(name), Some(description), Some(studies), Some(origin), true) = (
            draft.name,
            draft.description,
            draft.studies,
            draft.origin,
            violations.is_empty(),
        ) else {
            return Err(CoreError::InvalidDocument(violations.join("; ")));
        };

        let studies = studies
            .into_iter()
            .filter_map(|s| {
                s.id.map(|id| StudyRef {
                    id,
                    samples: s.samples,
                })
            })
            .collect();

        let mut study = Self::new(name, description, studies, origin);
        study.filters = draft.filters;
        study.set_owner(draft.owner.unwrap_or_else(|| ANONYMOUS_OWNER.to_string()));
        Ok(study)
    }

    /// Rebuild from the stored form, keeping the persisted `users` set.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDocument` if the stored JSON is not a
    /// virtual study.
    pub fn from_stored(value: &Value, created: DateTime<Utc>) -> Result<Self, CoreError> {
        let stored = StoredVirtualStudy::deserialize(value)
            .map_err(|e| CoreError::InvalidDocument(format!("stored virtual study: {e}")))?;
        Ok(Self {
            name: stored.name,
            description: stored.description,
            studies: stored.studies,
            filters: stored.filters,
            owner: stored.owner,
            origin: stored.origin,
            users: stored.users,
            created,
        })
    }

    /// Stored JSON form, including `users`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDocument` if serialization fails. Every
    /// field is a string, a string set or a string map, so this does not
    /// happen for studies built through this type.
    pub fn to_stored_value(&self) -> Result<Value, CoreError> {
        let stored = StoredVirtualStudyRef {
            name: &self.name,
            description: &self.description,
            studies: &self.studies,
            filters: self.filters.as_ref(),
            owner: &self.owner,
            origin: &self.origin,
            users: &self.users,
        };
        serde_json::to_value(stored)
            .map_err(|e| CoreError::InvalidDocument(format!("virtual study cannot be stored: {e}")))
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Assign the owner and recompute `users` from it.
    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = owner.into();
        self.users = if self.owner == ANONYMOUS_OWNER {
            BTreeSet::new()
        } else {
            BTreeSet::from([self.owner.clone()])
        };
    }

    #[must_use]
    pub const fn users(&self) -> &BTreeSet<String> {
        &self.users
    }

    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn set_created(&mut self, created: DateTime<Utc>) {
        self.created = created;
    }

    /// Apply a merge operation to `users`. Returns whether the set changed.
    ///
    /// `owner` is never touched.
    pub fn apply(&mut self, operation: OperationType, user: &str) -> bool {
        match operation {
            OperationType::AddUser => self.users.insert(user.to_string()),
            OperationType::RemoveUser => self.users.remove(user),
        }
    }
}
