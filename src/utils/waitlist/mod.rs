pub mod errors;

use time::OffsetDateTime;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::store::{contended, Store};
use crate::utils::events::models::{Event, GeoPoint, WaitlistLocation};
use crate::validation::{ValidateContent, ValidateContentError};

use self::errors::WaitlistError;

/// Admission onto an event's waiting list. The capacity and duplicate checks run
/// against the same event version that the write swaps out.
#[derive(Clone)]
pub struct WaitlistManager {
    store: Store,
    retries: u32,
}

impl WaitlistManager {
    pub fn new(store: Store, retries: u32) -> Self {
        Self { store, retries }
    }

    async fn fetch(&self, event_id: Uuid) -> Result<Event, WaitlistError> {
        self.store
            .fetch_event(event_id)
            .await?
            .ok_or(WaitlistError::NotFound)
    }

    pub async fn join(
        &self,
        event_id: Uuid,
        user_id: &str,
        location: Option<GeoPoint>,
    ) -> Result<Event, WaitlistError> {
        if user_id.trim().is_empty() {
            return Err(WaitlistError::InvalidArgument(
                "User id is required".to_string(),
            ));
        }
        if let Some(location) = &location {
            location.validate_content().map_err(|e| match e {
                ValidateContentError::Expected(reason) => WaitlistError::InvalidArgument(reason),
                ValidateContentError::Unexpected(e) => WaitlistError::Store(e.into()),
            })?;
        }

        let now = OffsetDateTime::now_utc();
        let event = self.admit(event_id, user_id, location.is_some(), now).await?;

        if let Some(location) = location {
            let entry = WaitlistLocation {
                event_id,
                user_id: user_id.to_string(),
                location,
                recorded_at: now,
            };
            if let Err(e) = self.store.record_location(entry).await {
                warn!("Could not record location of {user_id} for {event_id}: {e}");
            }
        }

        Ok(event)
    }

    async fn admit(
        &self,
        event_id: Uuid,
        user_id: &str,
        has_location: bool,
        now: OffsetDateTime,
    ) -> Result<Event, WaitlistError> {
        for _ in 0..=self.retries {
            let mut event = self.fetch(event_id).await?;
            if event.lottery_complete || event.registration_ended(now) {
                return Err(WaitlistError::RegistrationClosed);
            }
            if !event.registration_started(now) {
                return Err(WaitlistError::RegistrationNotOpen);
            }
            if event.geolocation_required && !has_location {
                return Err(WaitlistError::InvalidArgument(
                    "This event requires your location to join".to_string(),
                ));
            }
            if event.is_on_waiting_list(user_id) {
                return Err(WaitlistError::AlreadyOnList);
            }
            if event.is_waiting_list_full() {
                return Err(WaitlistError::ListFull);
            }

            event.waiting_list.push(user_id.to_string());
            event.touch(now);
            if self.store.replace_event(&event).await? {
                debug!("{user_id} joined the waiting list of {event_id}");
                event.version += 1;
                return Ok(event);
            }
            trace!("Join of {user_id} raced another write on {event_id}");
        }

        Err(contended("event", event_id, self.retries + 1).into())
    }

    pub async fn leave(&self, event_id: Uuid, user_id: &str) -> Result<Event, WaitlistError> {
        for _ in 0..=self.retries {
            let mut event = self.fetch(event_id).await?;
            if !event.is_on_waiting_list(user_id) {
                return Err(WaitlistError::NotOnList);
            }

            event.waiting_list.retain(|entrant| entrant != user_id);
            event.touch(OffsetDateTime::now_utc());
            if self.store.replace_event(&event).await? {
                debug!("{user_id} left the waiting list of {event_id}");
                event.version += 1;
                return Ok(event);
            }
        }

        Err(contended("event", event_id, self.retries + 1).into())
    }

    pub async fn size(&self, event_id: Uuid) -> Result<usize, WaitlistError> {
        Ok(self.fetch(event_id).await?.waiting_list.len())
    }

    /// Recorded join locations, visible to the organizer only.
    pub async fn locations(
        &self,
        event_id: Uuid,
        organizer_id: &str,
    ) -> Result<Vec<WaitlistLocation>, WaitlistError> {
        if !self.fetch(event_id).await?.is_organized_by(organizer_id) {
            return Err(WaitlistError::Forbidden);
        }
        Ok(self.store.list_locations(event_id).await?)
    }
}
