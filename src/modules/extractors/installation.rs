use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
};
use http::request::Parts;

use crate::modules::Services;
use crate::utils::users::errors::UserError;
use crate::utils::users::models::User;

pub const INSTALLATION_HEADER: &str = "x-installation-id";

/// Opaque per-installation identity sent by the client in `X-Installation-Id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Installation
where
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(INSTALLATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(UserError::Unidentified)?;
        Ok(Self(id.to_string()))
    }
}

/// The caller's user document, created as an entrant on first sight.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Services: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = UserError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Installation(id) = Installation::from_request_parts(parts, state).await?;
        let services = Services::from_ref(state);
        Ok(Self(services.users.ensure(&id).await?))
    }
}
