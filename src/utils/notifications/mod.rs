pub mod errors;
pub mod models;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::store::Store;
use crate::utils::events::models::Event;
use crate::utils::invitations::models::{InvitationFilter, InvitationState};
use crate::utils::users::models::{Role, User};

use self::errors::NotificationError;
use self::models::{Audience, Notification, NotificationKind, PushMessage};

/// Delivery transport for pushes. Failures are logged, never reported back.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn push(
        &self,
        recipient_id: &str,
        device_token: Option<&str>,
        message: &PushMessage,
    ) -> anyhow::Result<()>;
}

/// Channel that only records deliveries in the log.
pub struct TracingChannel;

#[async_trait]
impl PushChannel for TracingChannel {
    async fn push(
        &self,
        recipient_id: &str,
        device_token: Option<&str>,
        message: &PushMessage,
    ) -> anyhow::Result<()> {
        info!(
            recipient_id,
            device_token,
            notification_id = %message.notification_id,
            deleted = message.deleted,
            "push: {}",
            message.title
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationFanout {
    store: Store,
    channel: Arc<dyn PushChannel>,
}

impl NotificationFanout {
    pub fn new(store: Store, channel: Arc<dyn PushChannel>) -> Self {
        Self { store, channel }
    }

    /// Writes one notification body for `recipients` and pushes it. Duplicate
    /// recipients are collapsed, an empty set writes nothing.
    pub async fn notify_event_transition(
        &self,
        event: &Event,
        recipients: &[String],
        kind: NotificationKind,
    ) -> Result<Option<Notification>, NotificationError> {
        let recipients: Vec<String> = recipients
            .iter()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if recipients.is_empty() {
            trace!("No recipients for {kind:?} on event {}", event.id);
            return Ok(None);
        }

        let notification = self
            .store
            .create_notification(kind.draft(event), &recipients, OffsetDateTime::now_utc())
            .await?;
        debug!(
            "Notification {} ({kind:?}) written for {} recipients",
            notification.id,
            recipients.len()
        );

        self.dispatch(
            PushMessage::deliver(&notification),
            notification.is_from_organizer(),
            recipients,
        );
        Ok(Some(notification))
    }

    /// Free text message from the organizer to one group of entrants.
    pub async fn broadcast(
        &self,
        event_id: Uuid,
        organizer_id: &str,
        audience: Audience,
        title: &str,
        message: &str,
    ) -> Result<Option<Notification>, NotificationError> {
        if title.trim().is_empty() || message.trim().is_empty() {
            return Err(NotificationError::InvalidArgument(
                "Title and message cannot be blank".to_string(),
            ));
        }

        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(NotificationError::EventNotFound)?;
        if !event.is_organized_by(organizer_id) {
            return Err(NotificationError::Forbidden);
        }

        let recipients = self.audience(&event, audience).await?;
        let kind = NotificationKind::Organizer {
            title: title.trim().to_string(),
            message: message.trim().to_string(),
        };
        self.notify_event_transition(&event, &recipients, kind)
            .await
    }

    async fn audience(
        &self,
        event: &Event,
        audience: Audience,
    ) -> Result<Vec<String>, NotificationError> {
        let invitations = self
            .store
            .query_invitations(&InvitationFilter::event(event.id))
            .await?;

        let recipients = match audience {
            Audience::Waitlist => event
                .waiting_list
                .iter()
                .filter(|id| !invitations.iter().any(|inv| &inv.recipient_id == *id))
                .cloned()
                .collect(),
            Audience::Selected => invitations
                .iter()
                .filter(|inv| {
                    matches!(
                        inv.state(),
                        InvitationState::Pending | InvitationState::Accepted
                    )
                })
                .map(|inv| inv.recipient_id.clone())
                .collect(),
            Audience::Cancelled => invitations
                .iter()
                .filter(|inv| {
                    matches!(
                        inv.state(),
                        InvitationState::Cancelled | InvitationState::Rejected
                    )
                })
                .map(|inv| inv.recipient_id.clone())
                .collect(),
            Audience::Everyone => event
                .waiting_list
                .iter()
                .cloned()
                .chain(invitations.into_iter().map(|inv| inv.recipient_id))
                .collect(),
        };
        Ok(recipients)
    }

    pub async fn feed(&self, user_id: &str) -> Result<Vec<Notification>, NotificationError> {
        Ok(self.store.user_feed(user_id).await?)
    }

    /// Soft delete. Only the authoring organizer or an admin may retract.
    pub async fn delete(
        &self,
        notification_id: Uuid,
        actor: &User,
    ) -> Result<Notification, NotificationError> {
        let (notification, recipients) = self
            .store
            .fetch_notification(notification_id)
            .await?
            .ok_or(NotificationError::NotFound)?;

        let authored = notification.organizer_id.as_deref() == Some(actor.user_id.as_str());
        if !authored && !actor.has_abilities_of_role(Role::Admin) {
            return Err(NotificationError::Forbidden);
        }
        if notification.deleted {
            return Ok(notification);
        }

        if !self.store.mark_notification_deleted(notification_id).await? {
            return Err(NotificationError::NotFound);
        }
        let notification = Notification {
            deleted: true,
            ..notification
        };

        self.dispatch(
            PushMessage::retract(&notification),
            notification.is_from_organizer(),
            recipients,
        );
        Ok(notification)
    }

    fn dispatch(&self, message: PushMessage, from_organizer: bool, recipients: Vec<String>) {
        let store = self.store.clone();
        let channel = self.channel.clone();

        tokio::spawn(async move {
            let users = match store.fetch_users(&recipients).await {
                Ok(users) => users,
                Err(e) => {
                    warn!("Skipping push for {}: {e}", message.notification_id);
                    return;
                }
            };
            let users: HashMap<&str, &User> = users
                .iter()
                .map(|user| (user.user_id.as_str(), user))
                .collect();

            for recipient_id in &recipients {
                let user = users.get(recipient_id.as_str());
                if user.map_or(false, |user| !user.wants_push(from_organizer)) {
                    trace!("{recipient_id} opted out of this push");
                    continue;
                }
                let device_token = user.and_then(|user| user.device_token.as_deref());
                if let Err(e) = channel.push(recipient_id, device_token, &message).await {
                    warn!("Push to {recipient_id} failed: {e:#}");
                }
            }
        });
    }
}
