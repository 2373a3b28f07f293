use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{broadcast, Mutex};
use tracing::trace;
use uuid::Uuid;

use super::errors::StoreError;
use super::{Change, DocumentStore, CHANGE_FEED_CAPACITY};
use crate::utils::events::models::{Event, EventDraft, WaitlistLocation};
use crate::utils::invitations::models::{Invitation, InvitationDraft, InvitationFilter};
use crate::utils::notifications::models::{Notification, NotificationDraft, UserNotification};
use crate::utils::users::models::User;

#[derive(Default)]
struct Collections {
    events: HashMap<Uuid, Event>,
    locations: HashMap<(Uuid, String), WaitlistLocation>,
    invitations: Vec<Invitation>,
    notifications: HashMap<Uuid, Notification>,
    user_notifications: Vec<UserNotification>,
    users: HashMap<String, User>,
}

/// In-process store. One lock guards every collection, so each call is atomic.
pub struct MemoryStore {
    collections: Mutex<Collections>,
    changes: broadcast::Sender<Change>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            collections: Mutex::new(Collections::default()),
            changes,
        }
    }

    fn publish(&self, change: Change) {
        // nobody listening is fine
        let _ = self.changes.send(change);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_event(
        &self,
        organizer_id: &str,
        draft: EventDraft,
        now: OffsetDateTime,
    ) -> Result<Event, StoreError> {
        let event = Event::new(Uuid::new_v4(), organizer_id, draft, now);
        self.collections
            .lock()
            .await
            .events
            .insert(event.id, event.clone());
        self.publish(Change::Event { id: event.id });
        Ok(event)
    }

    async fn fetch_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.collections.lock().await.events.get(&event_id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self
            .collections
            .lock()
            .await
            .events
            .values()
            .cloned()
            .collect();
        events.sort_by_key(|event| event.created_at);
        Ok(events)
    }

    async fn replace_event(&self, event: &Event) -> Result<bool, StoreError> {
        let mut collections = self.collections.lock().await;
        let Some(stored) = collections.events.get_mut(&event.id) else {
            return Ok(false);
        };
        if stored.version != event.version {
            trace!("Event {} moved to version {}", event.id, stored.version);
            return Ok(false);
        }
        *stored = Event {
            version: event.version + 1,
            ..event.clone()
        };
        drop(collections);

        self.publish(Change::Event { id: event.id });
        Ok(true)
    }

    async fn commit_draw(
        &self,
        event: &Event,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<Invitation>>, StoreError> {
        let mut collections = self.collections.lock().await;
        let Some(stored) = collections.events.get_mut(&event.id) else {
            return Ok(None);
        };
        if stored.version != event.version {
            return Ok(None);
        }
        *stored = Event {
            version: event.version + 1,
            ..event.clone()
        };

        let invitations: Vec<Invitation> = drafts
            .into_iter()
            .map(|draft| Invitation::new(Uuid::new_v4(), draft, now))
            .collect();
        collections.invitations.extend(invitations.iter().cloned());
        drop(collections);

        self.publish(Change::Event { id: event.id });
        if !invitations.is_empty() {
            self.publish(Change::Invitations { event_id: event.id });
        }
        Ok(Some(invitations))
    }

    async fn record_location(&self, entry: WaitlistLocation) -> Result<(), StoreError> {
        self.collections
            .lock()
            .await
            .locations
            .insert((entry.event_id, entry.user_id.clone()), entry);
        Ok(())
    }

    async fn list_locations(&self, event_id: Uuid) -> Result<Vec<WaitlistLocation>, StoreError> {
        let mut locations: Vec<WaitlistLocation> = self
            .collections
            .lock()
            .await
            .locations
            .values()
            .filter(|entry| entry.event_id == event_id)
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(locations)
    }

    async fn create_invitations(
        &self,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Vec<Invitation>, StoreError> {
        let invitations: Vec<Invitation> = drafts
            .into_iter()
            .map(|draft| Invitation::new(Uuid::new_v4(), draft, now))
            .collect();

        self.collections
            .lock()
            .await
            .invitations
            .extend(invitations.iter().cloned());

        let mut touched: Vec<Uuid> = invitations.iter().map(|inv| inv.event_id).collect();
        touched.sort();
        touched.dedup();
        for event_id in touched {
            self.publish(Change::Invitations { event_id });
        }
        Ok(invitations)
    }

    async fn fetch_invitation(
        &self,
        invitation_id: Uuid,
    ) -> Result<Option<Invitation>, StoreError> {
        Ok(self
            .collections
            .lock()
            .await
            .invitations
            .iter()
            .find(|inv| inv.id == invitation_id)
            .cloned())
    }

    async fn replace_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError> {
        let mut collections = self.collections.lock().await;
        let Some(stored) = collections
            .invitations
            .iter_mut()
            .find(|inv| inv.id == invitation.id)
        else {
            return Ok(false);
        };
        if stored.version != invitation.version {
            trace!("Invitation {} moved to version {}", invitation.id, stored.version);
            return Ok(false);
        }
        *stored = Invitation {
            version: invitation.version + 1,
            ..invitation.clone()
        };
        drop(collections);

        self.publish(Change::Invitations {
            event_id: invitation.event_id,
        });
        Ok(true)
    }

    async fn query_invitations(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError> {
        Ok(self
            .collections
            .lock()
            .await
            .invitations
            .iter()
            .filter(|inv| filter.matches(inv))
            .cloned()
            .collect())
    }

    async fn create_notification(
        &self,
        draft: NotificationDraft,
        recipients: &[String],
        now: OffsetDateTime,
    ) -> Result<Notification, StoreError> {
        let notification = Notification::new(Uuid::new_v4(), draft, now);

        let mut collections = self.collections.lock().await;
        collections
            .user_notifications
            .extend(recipients.iter().map(|user_id| UserNotification {
                user_id: user_id.clone(),
                notification_id: notification.id,
            }));
        collections
            .notifications
            .insert(notification.id, notification.clone());
        drop(collections);

        self.publish(Change::Notification {
            id: notification.id,
        });
        Ok(notification)
    }

    async fn fetch_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<(Notification, Vec<String>)>, StoreError> {
        let collections = self.collections.lock().await;
        let Some(notification) = collections.notifications.get(&notification_id) else {
            return Ok(None);
        };
        let recipients = collections
            .user_notifications
            .iter()
            .filter(|row| row.notification_id == notification_id)
            .map(|row| row.user_id.clone())
            .collect();
        Ok(Some((notification.clone(), recipients)))
    }

    async fn mark_notification_deleted(&self, notification_id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.lock().await;
        let Some(notification) = collections.notifications.get_mut(&notification_id) else {
            return Ok(false);
        };
        notification.deleted = true;
        drop(collections);

        self.publish(Change::Notification {
            id: notification_id,
        });
        Ok(true)
    }

    async fn user_feed(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let collections = self.collections.lock().await;
        let mut feed: Vec<Notification> = collections
            .user_notifications
            .iter()
            .filter(|row| row.user_id == user_id)
            .filter_map(|row| collections.notifications.get(&row.notification_id))
            .filter(|notification| !notification.deleted)
            .cloned()
            .collect();
        feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(feed)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.collections.lock().await.users.get(user_id).cloned())
    }

    async fn fetch_users(&self, user_ids: &[String]) -> Result<Vec<User>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| collections.users.get(id))
            .cloned()
            .collect())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        self.collections
            .lock()
            .await
            .users
            .insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }
}
