use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;
use crate::validation::ValidateContentError;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Event not found")]
    NotFound,
    #[error("Only the organizer can do that")]
    Forbidden,
    #[error("Creating events requires organizer abilities")]
    NotAnOrganizer,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for EventError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            EventError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EventError::NotFound => StatusCode::NOT_FOUND,
            EventError::Forbidden | EventError::NotAnOrganizer => StatusCode::FORBIDDEN,
            EventError::Store(e) => e.status_code(),
            EventError::Unexpected(e) => {
                tracing::error!("Internal server error: {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let info = match self {
            EventError::Store(e) => return e.into_response(),
            EventError::Unexpected(_) => "Unexpected server error".to_string(),
            other => other.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}

impl From<ValidateContentError> for EventError {
    fn from(e: ValidateContentError) -> Self {
        match e {
            ValidateContentError::Expected(reason) => Self::InvalidArgument(reason),
            ValidateContentError::Unexpected(e) => Self::Unexpected(e),
        }
    }
}
