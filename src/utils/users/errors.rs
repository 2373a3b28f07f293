use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("User not found")]
    NotFound,
    #[error("Missing installation identifier")]
    Unidentified,
    #[error("Your role does not allow this")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for UserError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            UserError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Unidentified => StatusCode::UNAUTHORIZED,
            UserError::Forbidden => StatusCode::FORBIDDEN,
            UserError::Store(e) => e.status_code(),
        };

        let info = match self {
            UserError::Store(e) => return e.into_response(),
            other => other.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}
