use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use taskflow_shared::ErrorResponse;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Validation(String),

    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl ResponseError for RepositoryError {
    fn status_code(&self) -> StatusCode {
        match self {
            RepositoryError::Validation(_) => StatusCode::BAD_REQUEST,
            RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
            RepositoryError::Storage(_) | RepositoryError::CorruptRow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            // Storage details stay in the log.
            RepositoryError::Storage(_) | RepositoryError::CorruptRow(_) => {
                "storage failure".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse { error })
    }
}

/// Reasons a suggestion could not come from the provider. Never leaves the
/// suggestion service.
#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("provider response had no text")]
    EmptyResponse,

    #[error("malformed suggestion: {0}")]
    Malformed(#[from] serde_json::Error),
}
