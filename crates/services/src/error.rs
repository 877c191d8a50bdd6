//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::SessionStateError;
use quiz_core::prompt::ParameterError;
use storage::StorageError;

/// Failures of the external text-generation call. Terminal for the task.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured (GOOGLE_API_KEY is not set)")]
    Disabled,
    #[error("generation service returned an empty response")]
    EmptyResponse,
    #[error("generation service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("generation service error: {0}")]
    Service(String),
}

/// Errors emitted by the quiz session workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("invalid batch size: {0}")]
    BatchSize(#[source] ParameterError),
    #[error("worker pool needs at least one slot")]
    NoWorkers,
}
