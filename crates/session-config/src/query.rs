//! Query-by-field configuration.

use serde::{Deserialize, Serialize};
use session_core::query::{FieldPolicy, MAX_FIELD_DEPTH};

use crate::ConfigError;

const fn default_max_depth() -> usize {
    MAX_FIELD_DEPTH
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Field paths clients may query. Empty permits any valid path.
    #[serde(default)]
    pub allowed_fields: Vec<String>,

    /// Maximum number of segments in a queried field path.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            allowed_fields: Vec::new(),
            max_depth: default_max_depth(),
        }
    }
}

impl QueryConfig {
    /// Build the field policy enforced by the lifecycle service.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `max_depth` is zero or an
    /// allowed field is not a valid path.
    pub fn field_policy(&self) -> Result<FieldPolicy, ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query.max_depth".into(),
                reason: "must be at least 1".into(),
            });
        }
        FieldPolicy::new(&self.allowed_fields, self.max_depth).map_err(|e| {
            ConfigError::InvalidValue {
                field: "query.allowed_fields".into(),
                reason: e.to_string(),
            }
        })
    }
}
