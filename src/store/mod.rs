//! Document store contract the core is written against.
//!
//! Events and invitations are versioned documents. Mutations read a document,
//! decide on the copy and write it back with [`DocumentStore::replace_event`] or
//! [`DocumentStore::replace_invitation`], which only succeed while the stored
//! version still equals the one that was read. A `false` result means another
//! writer got there first and the caller has to re-read and decide again.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::utils::events::models::{Event, EventDraft, WaitlistLocation};
use crate::utils::invitations::models::{Invitation, InvitationDraft, InvitationFilter};
use crate::utils::notifications::models::{Notification, NotificationDraft};
use crate::utils::users::models::User;

pub mod errors;
pub mod memory;
pub mod postgres;
pub mod subscription;
pub mod timed;

use self::errors::StoreError;

pub type Store = Arc<dyn DocumentStore>;

/// Capacity of the change feed before slow subscribers start lagging.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Raised once a compare-and-swap loop ran out of attempts.
pub fn contended(document: &str, id: Uuid, attempts: u32) -> StoreError {
    warn!("Gave up on {document} {id} after {attempts} conflicting writes");
    StoreError::Unavailable
}

/// Signal pushed to subscribers after a committed write.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    Event { id: Uuid },
    Invitations { event_id: Uuid },
    Notification { id: Uuid },
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_event(
        &self,
        organizer_id: &str,
        draft: EventDraft,
        now: OffsetDateTime,
    ) -> Result<Event, StoreError>;

    async fn fetch_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Compare-and-swap on `event.version`. The stored copy gets `version + 1`.
    async fn replace_event(&self, event: &Event) -> Result<bool, StoreError>;

    /// Event compare-and-swap plus invitation batch, all or nothing.
    /// `None` when the event version moved in the meantime.
    async fn commit_draw(
        &self,
        event: &Event,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<Invitation>>, StoreError>;

    async fn record_location(&self, entry: WaitlistLocation) -> Result<(), StoreError>;

    async fn list_locations(&self, event_id: Uuid) -> Result<Vec<WaitlistLocation>, StoreError>;

    /// All or nothing batch. Returned in the order of `drafts`.
    async fn create_invitations(
        &self,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Vec<Invitation>, StoreError>;

    async fn fetch_invitation(&self, invitation_id: Uuid)
        -> Result<Option<Invitation>, StoreError>;

    /// Compare-and-swap on `invitation.version`.
    async fn replace_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError>;

    async fn query_invitations(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError>;

    /// Writes the join rows and the body as one unit.
    async fn create_notification(
        &self,
        draft: NotificationDraft,
        recipients: &[String],
        now: OffsetDateTime,
    ) -> Result<Notification, StoreError>;

    async fn fetch_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<(Notification, Vec<String>)>, StoreError>;

    /// Sets `deleted`, returns `false` if the notification does not exist.
    async fn mark_notification_deleted(&self, notification_id: Uuid) -> Result<bool, StoreError>;

    /// Non-deleted notifications joined to `user_id`, newest first.
    async fn user_feed(&self, user_id: &str) -> Result<Vec<Notification>, StoreError>;

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    async fn fetch_users(&self, user_ids: &[String]) -> Result<Vec<User>, StoreError>;

    async fn upsert_user(&self, user: &User) -> Result<(), StoreError>;

    fn changes(&self) -> broadcast::Receiver<Change>;
}
