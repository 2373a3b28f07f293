use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{contended, Store};
use crate::utils::invitations::models::{Invitation, InvitationFilter, InvitationState};
use crate::utils::users::models::{Role, User};
use crate::validation::ValidateContent;

use self::errors::EventError;
use self::models::{
    EntrantStatus, Event, EventDraft, EventPhase, EventView, InvitationSummary, PartitionedEvents,
};

pub mod errors;
pub mod exe;
pub mod models;

#[derive(Clone)]
pub struct EventRegistry {
    store: Store,
    retries: u32,
}

impl EventRegistry {
    pub fn new(store: Store, retries: u32) -> Self {
        Self { store, retries }
    }

    pub async fn create(&self, organizer: &User, draft: EventDraft) -> Result<Event, EventError> {
        if !organizer.has_abilities_of_role(Role::Organizer) {
            return Err(EventError::NotAnOrganizer);
        }
        draft.validate_content()?;

        let event = self
            .store
            .create_event(&organizer.user_id, draft, OffsetDateTime::now_utc())
            .await?;
        info!("{} created event {}", organizer.user_id, event.id);
        Ok(event)
    }

    pub async fn get(&self, event_id: Uuid) -> Result<Event, EventError> {
        self.store
            .fetch_event(event_id)
            .await?
            .ok_or(EventError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Event>, EventError> {
        Ok(self.store.list_events().await?)
    }

    pub async fn partitioned(&self, now: OffsetDateTime) -> Result<PartitionedEvents, EventError> {
        Ok(partition(self.list().await?, now))
    }

    /// Event together with what `viewer` should see of it.
    pub async fn view(
        &self,
        event_id: Uuid,
        viewer: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<EventView, EventError> {
        let event = self.get(event_id).await?;
        let invitations = self
            .store
            .query_invitations(&InvitationFilter::event(event_id))
            .await?;

        Ok(EventView {
            phase: phase(&event, now),
            status: viewer.and_then(|user_id| entrant_status(&event, &invitations, user_id)),
            summary: summarize(&event, &invitations),
            event,
        })
    }

    /// Closes the event for good. The flag is `false` if it was already cancelled.
    pub async fn close(
        &self,
        event_id: Uuid,
        organizer_id: &str,
    ) -> Result<(Event, bool), EventError> {
        for _ in 0..=self.retries {
            let mut event = self.get(event_id).await?;
            if !event.is_organized_by(organizer_id) {
                return Err(EventError::Forbidden);
            }
            if event.cancelled_at.is_some() {
                return Ok((event, false));
            }

            let now = OffsetDateTime::now_utc();
            event.cancelled_at = Some(now);
            event.lottery_complete = true;
            event.touch(now);
            if self.store.replace_event(&event).await? {
                debug!("Event {event_id} cancelled");
                event.version += 1;
                return Ok((event, true));
            }
        }

        Err(contended("event", event_id, self.retries + 1).into())
    }
}

pub fn phase(event: &Event, now: OffsetDateTime) -> EventPhase {
    if event.lottery_complete {
        EventPhase::Finished
    } else if !event.registration_started(now) {
        EventPhase::NotStarted
    } else if event.registration_ended(now) {
        EventPhase::LotteryDone
    } else {
        EventPhase::Open
    }
}

/// Invitation state takes precedence over bare waiting list membership.
pub fn entrant_status(
    event: &Event,
    invitations: &[Invitation],
    user_id: &str,
) -> Option<EntrantStatus> {
    let mine: Vec<&Invitation> = invitations
        .iter()
        .filter(|inv| inv.event_id == event.id && inv.recipient_id == user_id)
        .collect();

    let current = mine
        .iter()
        .filter(|inv| inv.is_pending())
        .max_by_key(|inv| inv.send_time)
        .or_else(|| {
            mine.iter()
                .filter(|inv| !inv.cancelled)
                .max_by_key(|inv| inv.send_time)
        });

    if let Some(invitation) = current {
        return Some(match invitation.state() {
            InvitationState::Pending => EntrantStatus::Pending,
            InvitationState::Accepted => EntrantStatus::Accepted,
            InvitationState::Rejected => EntrantStatus::Rejected,
            InvitationState::Cancelled => EntrantStatus::NotSelected,
        });
    }

    // only cancelled invitations left
    if !mine.is_empty() {
        return Some(EntrantStatus::NotSelected);
    }

    if event.is_on_waiting_list(user_id) {
        let drawn = event.lottery_complete
            || invitations.iter().any(|inv| inv.event_id == event.id);
        return Some(if drawn {
            EntrantStatus::NotSelected
        } else {
            EntrantStatus::Waitlist
        });
    }

    None
}

pub fn summarize(event: &Event, invitations: &[Invitation]) -> InvitationSummary {
    invitations
        .iter()
        .filter(|inv| inv.event_id == event.id)
        .fold(
            InvitationSummary {
                waitlisted: event.waiting_list.len(),
                ..Default::default()
            },
            |mut summary, inv| {
                match inv.state() {
                    InvitationState::Pending => summary.pending += 1,
                    InvitationState::Accepted => summary.accepted += 1,
                    InvitationState::Rejected => summary.rejected += 1,
                    InvitationState::Cancelled => summary.cancelled += 1,
                }
                summary
            },
        )
}

/// Upcoming while registration has no end or ends in the future.
pub fn partition(events: Vec<Event>, now: OffsetDateTime) -> PartitionedEvents {
    let (past, upcoming): (Vec<Event>, Vec<Event>) = events
        .into_iter()
        .partition(|event| event.registration_ended(now));
    PartitionedEvents { upcoming, past }
}
