use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("The store did not answer in time, try again later")]
    Timeout,
    #[error("The store is currently unavailable, try again later")]
    Unavailable,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl StoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            StoreError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code();

        let info = match self {
            StoreError::Unexpected(e) => {
                tracing::error!("Internal server error: {e:?}");
                "Unexpected server error".to_string()
            }
            other => other.to_string(),
        };

        (status_code, Json(json!({ "error_info": info }))).into_response()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => Self::Timeout,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) => Self::Unavailable,
            e => Self::Unexpected(anyhow::Error::from(e)),
        }
    }
}
