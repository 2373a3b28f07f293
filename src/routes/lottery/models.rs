use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::invitations::models::Invitation;
use crate::utils::lottery::Draw;

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct DrawOutcome {
    /// Invitations created by this draw, empty when nothing was due.
    pub invitations: Vec<Invitation>,
    /// How many entrants were told they were not selected.
    pub not_selected: usize,
}

impl From<Draw> for DrawOutcome {
    fn from(draw: Draw) -> Self {
        Self {
            not_selected: draw.losers.len(),
            invitations: draw.invitations,
        }
    }
}
