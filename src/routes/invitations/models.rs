use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CreateInvites {
    pub recipient_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CreatedInvites {
    /// Same order as the requested recipients.
    pub invitation_ids: Vec<Uuid>,
}
