use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use quiz_core::model::SessionStateError;
use services::SessionError;

/// Errors returned by HTTP handlers, rendered as `{success: false, error}`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::State(state @ SessionStateError::NoCurrentQuestion) => {
                Self::Conflict(state.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::StorageError;

    #[test]
    fn missing_question_is_a_conflict() {
        let err = ApiError::from(SessionError::State(SessionStateError::NoCurrentQuestion));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "no current question to answer");
    }

    #[test]
    fn storage_failure_is_internal() {
        let err = ApiError::from(SessionError::Storage(StorageError::Connection("down".into())));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
