use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure surfaced by any workflow operation, classified by condition.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    BadRequest(String),
    /// A caller handed in a value outside the operation's domain. Indicates a bug upstream.
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("payment initiation failed: {0}")]
    PaymentInitiationFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::InvalidState(_) | WorkflowError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            WorkflowError::IllegalArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::PaymentInitiationFailed(_) => StatusCode::BAD_GATEWAY,
            WorkflowError::Internal(_) | WorkflowError::Repository(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => {
                WorkflowError::Conflict("an active record already exists".to_string())
            }
            RepositoryError::NotFound => WorkflowError::NotFound("record not found".to_string()),
            RepositoryError::Locked => {
                WorkflowError::Forbidden("course is locked while pending review".to_string())
            }
            other => WorkflowError::Repository(other),
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let payload = json!({ "error": self.to_string() });
        (status, Json(payload)).into_response()
    }
}

/// Error enumeration for storage failures shared by every workflow repository.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A store-level uniqueness constraint rejected the write.
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    /// The owning course is under review, so its content is read-only.
    #[error("owning course is locked")]
    Locked,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
