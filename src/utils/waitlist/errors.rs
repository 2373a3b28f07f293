use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::store::errors::StoreError;

#[derive(Error, Debug)]
pub enum WaitlistError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Event not found")]
    NotFound,
    #[error("You are already on the waiting list")]
    AlreadyOnList,
    #[error("The waiting list is full")]
    ListFull,
    #[error("You are not on the waiting list")]
    NotOnList,
    #[error("Registration for this event has not started yet")]
    RegistrationNotOpen,
    #[error("Registration for this event has ended")]
    RegistrationClosed,
    #[error("Only the organizer can do that")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for WaitlistError {
    fn into_response(self) -> axum::response::Response {
        let status_code = match &self {
            WaitlistError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WaitlistError::NotFound | WaitlistError::NotOnList => StatusCode::NOT_FOUND,
            WaitlistError::AlreadyOnList
            | WaitlistError::ListFull
            | WaitlistError::RegistrationNotOpen
            | WaitlistError::RegistrationClosed => StatusCode::CONFLICT,
            WaitlistError::Forbidden => StatusCode::FORBIDDEN,
            WaitlistError::Store(e) => e.status_code(),
        };

        let info = match self {
            WaitlistError::Store(e) => return e.into_response(),
            other => other.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}
