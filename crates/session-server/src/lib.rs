//! # session-server
//!
//! HTTP boundary for the session service: an axum router over
//! [`SessionService`](session_db::service::SessionService), the error-to-status
//! mapping, and the command-line surface of the `session-service` binary.

pub mod cli;
pub mod error;
pub mod routes;

use anyhow::Context;
use session_config::SessionServiceConfig;
use session_db::service::SessionService;

pub use routes::{AppState, router};

/// Open the configured database and apply the configured query policy.
///
/// # Errors
///
/// Fails if the query policy is invalid or the database cannot be opened.
pub async fn build_service(config: &SessionServiceConfig) -> anyhow::Result<SessionService> {
    let policy = config.query.field_policy()?;
    let service = SessionService::new_local(&config.database.path)
        .await
        .with_context(|| format!("failed to open session database '{}'", config.database.path))?;
    Ok(service.with_field_policy(policy))
}
