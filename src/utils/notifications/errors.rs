use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Notification not found")]
    NotFound,
    #[error("Event not found")]
    EventNotFound,
    #[error("You are not allowed to manage this notification")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            NotificationError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NotificationError::NotFound | NotificationError::EventNotFound => {
                StatusCode::NOT_FOUND
            }
            NotificationError::Forbidden => StatusCode::FORBIDDEN,
            NotificationError::Store(e) => e.status_code(),
        };

        let info = match self {
            NotificationError::Store(e) => return e.into_response(),
            other => other.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}
