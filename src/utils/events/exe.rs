use tracing::{debug, warn};
use uuid::Uuid;

use crate::modules::Services;
use crate::utils::events::errors::EventError;
use crate::utils::events::models::Event;
use crate::utils::invitations::models::InvitationFilter;
use crate::utils::notifications::models::NotificationKind;

/// Closes the event, withdraws every pending invitation and tells everyone
/// involved. Cancelling twice only returns the event.
pub async fn cancel_event(
    services: &Services,
    event_id: Uuid,
    organizer_id: &str,
) -> Result<Event, EventError> {
    let (event, newly_cancelled) = services.events.close(event_id, organizer_id).await?;
    if !newly_cancelled {
        return Ok(event);
    }

    let invitations = services
        .store
        .query_invitations(&InvitationFilter::event(event_id))
        .await?;
    for invitation in invitations.iter().filter(|inv| inv.is_pending()) {
        if let Err(e) = services.invitations.cancel(invitation.id, organizer_id).await {
            warn!("Could not withdraw invitation {}: {e}", invitation.id);
        }
    }

    let recipients: Vec<String> = event
        .waiting_list
        .iter()
        .cloned()
        .chain(invitations.into_iter().map(|inv| inv.recipient_id))
        .collect();
    debug!("Telling {} entrants that {event_id} is off", recipients.len());
    if let Err(e) = services
        .notifications
        .notify_event_transition(&event, &recipients, NotificationKind::EventCancelled)
        .await
    {
        warn!("Failed to announce cancellation of {event_id}: {e}");
    }

    Ok(event)
}
