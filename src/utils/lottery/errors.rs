use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;

#[derive(Error, Debug)]
pub enum LotteryError {
    #[error("Event not found")]
    NotFound,
    #[error("Only the organizer can run the lottery")]
    Forbidden,
    #[error("The lottery for this event is already complete")]
    AlreadyComplete,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for LotteryError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            LotteryError::NotFound => StatusCode::NOT_FOUND,
            LotteryError::Forbidden => StatusCode::FORBIDDEN,
            LotteryError::AlreadyComplete => StatusCode::CONFLICT,
            LotteryError::Store(e) => e.status_code(),
        };

        let info = match self {
            LotteryError::Store(e) => return e.into_response(),
            other => other.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}
