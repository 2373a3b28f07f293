use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::notifications::models::Audience;

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct BroadcastMessage {
    pub event_id: Uuid,
    #[serde(default)]
    pub audience: Audience,
    pub title: String,
    pub message: String,
}
