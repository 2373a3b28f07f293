use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::modules::Services;
use crate::utils::invitations::errors::InvitationError;
use crate::utils::invitations::models::{Invitation, InvitationFilter};
use crate::utils::notifications::models::NotificationKind;

/// A decline frees the seat, so a replacement is drawn right away.
pub async fn reject_invitation(
    services: &Services,
    invitation_id: Uuid,
    user_id: &str,
) -> Result<Invitation, InvitationError> {
    let invitation = services.invitations.reject(invitation_id, user_id).await?;

    match services
        .lottery
        .draw_replacements(invitation.event_id, 1, OffsetDateTime::now_utc())
        .await
    {
        Ok(draw) => debug!(
            "Replacement draw for {} invited {}",
            invitation.event_id,
            draw.invitations.len()
        ),
        Err(e) => warn!("Replacement draw for {} failed: {e}", invitation.event_id),
    }

    Ok(invitation)
}

pub async fn cancel_invitation(
    services: &Services,
    invitation_id: Uuid,
    organizer_id: &str,
) -> Result<Invitation, InvitationError> {
    let invitation = services.invitations.cancel(invitation_id, organizer_id).await?;

    let event = match services.store.fetch_event(invitation.event_id).await {
        Ok(Some(event)) => event,
        Ok(None) => return Ok(invitation),
        Err(e) => {
            warn!("Cancelled {invitation_id} but could not load its event: {e}");
            return Ok(invitation);
        }
    };
    if let Err(e) = services
        .notifications
        .notify_event_transition(
            &event,
            &[invitation.recipient_id.clone()],
            NotificationKind::InvitationCancelled,
        )
        .await
    {
        warn!("Failed to tell {} about the cancellation: {e}", invitation.recipient_id);
    }

    Ok(invitation)
}

/// Invitations of one event, organizer only.
pub async fn event_invitations(
    services: &Services,
    event_id: Uuid,
    organizer_id: &str,
) -> Result<Vec<Invitation>, InvitationError> {
    let event = services
        .store
        .fetch_event(event_id)
        .await?
        .ok_or(InvitationError::NotFound)?;
    if !event.is_organized_by(organizer_id) {
        return Err(InvitationError::Forbidden);
    }
    services
        .invitations
        .list(&InvitationFilter::event(event_id))
        .await
}

/// Direct invitations sent by the organizer outside of a draw.
pub async fn invite_recipients(
    services: &Services,
    event_id: Uuid,
    organizer_id: &str,
    recipient_ids: &[String],
) -> Result<Vec<Uuid>, InvitationError> {
    let event = services
        .store
        .fetch_event(event_id)
        .await?
        .ok_or(InvitationError::NotFound)?;
    if !event.is_organized_by(organizer_id) {
        return Err(InvitationError::Forbidden);
    }
    services
        .invitations
        .create_invites(event_id, organizer_id, recipient_ids)
        .await
}
