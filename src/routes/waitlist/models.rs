use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::events::models::GeoPoint;

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct JoinWaitlist {
    /// Required when the event asks for geolocation.
    pub location: Option<GeoPoint>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, ToSchema)]
pub struct WaitlistSize {
    pub event_id: Uuid,
    pub size: usize,
}
