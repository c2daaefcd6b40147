//! Mapping of lifecycle errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use session_core::errors::CoreError;
use session_db::error::SessionError;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: message.into(),
            },
        }
    }

    #[must_use]
    pub fn empty_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_document", "request body is empty")
    }

    #[must_use]
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            format!("missing query parameter '{name}'"),
        )
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match &e {
            SessionError::InvalidDocument(msg) | SessionError::InvalidQuery(msg) => {
                Self::new(StatusCode::BAD_REQUEST, e.kind(), msg.clone())
            }
            SessionError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, e.kind(), e.to_string())
            }
            SessionError::Database(inner) => {
                tracing::error!(error = %inner, "session store failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.kind(), "internal error")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnknownOperation(_) => {
                Self::new(StatusCode::BAD_REQUEST, "unknown_operation", e.to_string())
            }
            other => SessionError::from(other).into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use session_db::error::DatabaseError;

    use super::*;

    #[test]
    fn client_errors_are_4xx() {
        let cases = [
            (SessionError::InvalidDocument("x".into()), StatusCode::BAD_REQUEST),
            (SessionError::InvalidQuery("x".into()), StatusCode::BAD_REQUEST),
            (SessionError::NotFound { id: "ses-1".into() }, StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn store_faults_are_500_without_details() {
        let err = ApiError::from(SessionError::Database(DatabaseError::Query(
            "disk I/O error".into(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.error, "internal");
        assert_eq!(err.body.message, "internal error");
    }

    #[test]
    fn unknown_operation_is_400() {
        let err = ApiError::from(CoreError::UnknownOperation("promote".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body.error, "unknown_operation");
    }

    #[test]
    fn response_carries_status() {
        let response = ApiError::empty_body().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
