use crate::store::errors::StoreError;
use crate::utils::events::errors::EventError;
use crate::utils::invitations::errors::InvitationError;
use crate::utils::lottery::errors::LotteryError;
use crate::utils::notifications::errors::NotificationError;
use crate::utils::users::errors::UserError;
use crate::utils::waitlist::errors::WaitlistError;
use anyhow::{anyhow, Context};
use axum::response::IntoResponse;
use std::panic::Location;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    StoreError(#[from] StoreError),
    #[error(transparent)]
    EventError(#[from] EventError),
    #[error(transparent)]
    WaitlistError(#[from] WaitlistError),
    #[error(transparent)]
    LotteryError(#[from] LotteryError),
    #[error(transparent)]
    InvitationError(#[from] InvitationError),
    #[error(transparent)]
    NotificationError(#[from] NotificationError),
    #[error(transparent)]
    UserError(#[from] UserError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::StoreError(e) => e.into_response(),
            AppError::EventError(e) => e.into_response(),
            AppError::WaitlistError(e) => e.into_response(),
            AppError::LotteryError(e) => e.into_response(),
            AppError::InvitationError(e) => e.into_response(),
            AppError::NotificationError(e) => e.into_response(),
            AppError::UserError(e) => e.into_response(),
        }
    }
}

/// Attaches the caller location to an unexpected failure.
pub trait DefaultContext<T> {
    fn dc(self) -> Result<T, anyhow::Error>;
}

impl<T, E> DefaultContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[track_caller]
    fn dc(self) -> Result<T, anyhow::Error> {
        let location = Location::caller();
        self.with_context(|| format!("Failed at {location}"))
    }
}

impl<T> DefaultContext<T> for Option<T> {
    #[track_caller]
    fn dc(self) -> Result<T, anyhow::Error> {
        let location = Location::caller();
        self.ok_or_else(|| anyhow!("Missing value at {location}"))
    }
}
