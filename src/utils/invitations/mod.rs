pub mod errors;
pub mod exe;
pub mod models;

use std::sync::Arc;

use futures::FutureExt;
use time::OffsetDateTime;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::store::subscription::Subscription;
use crate::store::{contended, Change, Store};

use self::errors::InvitationError;
use self::models::{Invitation, InvitationDraft, InvitationFilter, Response};

/// Invitation lifecycle: pending, then accepted, rejected or cancelled.
/// Every transition is a compare-and-swap on the invitation document.
#[derive(Clone)]
pub struct InvitationManager {
    store: Store,
    retries: u32,
}

impl InvitationManager {
    pub fn new(store: Store, retries: u32) -> Self {
        Self { store, retries }
    }

    /// Creates one pending invitation per recipient as a single batch.
    /// Ids come back in the order of `recipient_ids`.
    pub async fn create_invites(
        &self,
        event_id: Uuid,
        organizer_id: &str,
        recipient_ids: &[String],
    ) -> Result<Vec<Uuid>, InvitationError> {
        if event_id.is_nil() {
            return Err(InvitationError::InvalidArgument(
                "Event id is required".to_string(),
            ));
        }
        if organizer_id.trim().is_empty() {
            return Err(InvitationError::InvalidArgument(
                "Organizer id is required".to_string(),
            ));
        }
        if recipient_ids.is_empty() || recipient_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(InvitationError::InvalidArgument(
                "At least one recipient is required".to_string(),
            ));
        }

        let drafts = recipient_ids
            .iter()
            .map(|recipient| InvitationDraft::new(event_id, organizer_id, recipient))
            .collect();
        let invitations = self
            .store
            .create_invitations(drafts, OffsetDateTime::now_utc())
            .await?;

        debug!("Created {} invitations for event {event_id}", invitations.len());
        Ok(invitations.into_iter().map(|inv| inv.id).collect())
    }

    pub async fn get(&self, invitation_id: Uuid) -> Result<Invitation, InvitationError> {
        self.store
            .fetch_invitation(invitation_id)
            .await?
            .ok_or(InvitationError::NotFound)
    }

    pub async fn list(&self, filter: &InvitationFilter) -> Result<Vec<Invitation>, InvitationError> {
        Ok(self.store.query_invitations(filter).await?)
    }

    pub async fn accept(
        &self,
        invitation_id: Uuid,
        user_id: &str,
    ) -> Result<Invitation, InvitationError> {
        self.respond(invitation_id, user_id, Response::Accept).await
    }

    pub async fn reject(
        &self,
        invitation_id: Uuid,
        user_id: &str,
    ) -> Result<Invitation, InvitationError> {
        self.respond(invitation_id, user_id, Response::Reject).await
    }

    pub async fn respond(
        &self,
        invitation_id: Uuid,
        user_id: &str,
        response: Response,
    ) -> Result<Invitation, InvitationError> {
        for _ in 0..=self.retries {
            let mut invitation = self.get(invitation_id).await?;
            if invitation.recipient_id != user_id {
                return Err(InvitationError::Forbidden);
            }
            // cancellation wins over any response
            if invitation.cancelled {
                return Err(InvitationError::Cancelled);
            }
            if invitation.accepted.is_some() {
                return Err(InvitationError::AlreadyResponded);
            }

            invitation.accepted = Some(response.accepted());
            invitation.response_time = Some(OffsetDateTime::now_utc());
            if self.store.replace_invitation(&invitation).await? {
                trace!("Invitation {invitation_id} answered with {response:?}");
                invitation.version += 1;
                return Ok(invitation);
            }
        }

        Err(contended("invitation", invitation_id, self.retries + 1).into())
    }

    /// Organizer-only, and only while the invitation is still pending.
    pub async fn cancel(
        &self,
        invitation_id: Uuid,
        organizer_id: &str,
    ) -> Result<Invitation, InvitationError> {
        for _ in 0..=self.retries {
            let mut invitation = self.get(invitation_id).await?;
            if invitation.organizer_id != organizer_id {
                return Err(InvitationError::Forbidden);
            }
            if invitation.cancelled {
                return Err(InvitationError::Cancelled);
            }
            if invitation.accepted.is_some() {
                return Err(InvitationError::AlreadyResponded);
            }

            invitation.cancelled = true;
            invitation.cancel_time = Some(OffsetDateTime::now_utc());
            if self.store.replace_invitation(&invitation).await? {
                trace!("Invitation {invitation_id} cancelled");
                invitation.version += 1;
                return Ok(invitation);
            }
        }

        Err(contended("invitation", invitation_id, self.retries + 1).into())
    }

    /// Live list of the event's invitations. The first item is the current list.
    pub fn observe_event_invitations(&self, event_id: Uuid) -> Subscription<Vec<Invitation>> {
        let store = self.store.clone();
        let filter = Arc::new(InvitationFilter::event(event_id));

        Subscription::new(
            "event invitations",
            self.store.changes(),
            move |change| matches!(change, Change::Invitations { event_id: id } if *id == event_id),
            move || {
                let store = store.clone();
                let filter = filter.clone();
                async move { store.query_invitations(&filter).await }.boxed()
            },
        )
    }
}
