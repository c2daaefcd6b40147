//! libSQL storage configuration.

use serde::{Deserialize, Serialize};

/// Path libSQL treats as a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

fn default_path() -> String {
    "session-service.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Local database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

impl DatabaseConfig {
    /// Whether the database is discarded when the process exits.
    pub fn is_in_memory(&self) -> bool {
        self.path == IN_MEMORY_PATH
    }
}
