use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;

#[derive(Error, Debug)]
pub enum InvitationError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Invitation not found")]
    NotFound,
    #[error("This invitation is not yours to manage")]
    Forbidden,
    #[error("You already responded to this invitation")]
    AlreadyResponded,
    #[error("This invitation was cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for InvitationError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            InvitationError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            InvitationError::NotFound => StatusCode::NOT_FOUND,
            InvitationError::Forbidden => StatusCode::FORBIDDEN,
            InvitationError::AlreadyResponded => StatusCode::CONFLICT,
            InvitationError::Cancelled => StatusCode::GONE,
            InvitationError::Store(e) => e.status_code(),
        };

        let info = match self {
            InvitationError::Store(e) => return e.into_response(),
            other => other.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}
