use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use super::errors::StoreError;
use super::{Change, DocumentStore, Store};
use crate::utils::events::models::{Event, EventDraft, WaitlistLocation};
use crate::utils::invitations::models::{Invitation, InvitationDraft, InvitationFilter};
use crate::utils::notifications::models::{Notification, NotificationDraft};
use crate::utils::users::models::User;

/// Bounds every call of the wrapped store. An elapsed call fails with
/// [`StoreError::Timeout`] and is not retried here.
pub struct TimedStore {
    inner: Store,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Store, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(res) => res,
            Err(_) => {
                warn!("Store call `{operation}` exceeded {:?}", self.timeout);
                Err(StoreError::Timeout)
            }
        }
    }
}

#[async_trait]
impl DocumentStore for TimedStore {
    async fn create_event(
        &self,
        organizer_id: &str,
        draft: EventDraft,
        now: OffsetDateTime,
    ) -> Result<Event, StoreError> {
        self.bounded("create_event", self.inner.create_event(organizer_id, draft, now))
            .await
    }

    async fn fetch_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        self.bounded("fetch_event", self.inner.fetch_event(event_id))
            .await
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.bounded("list_events", self.inner.list_events()).await
    }

    async fn replace_event(&self, event: &Event) -> Result<bool, StoreError> {
        self.bounded("replace_event", self.inner.replace_event(event))
            .await
    }

    async fn commit_draw(
        &self,
        event: &Event,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<Invitation>>, StoreError> {
        self.bounded("commit_draw", self.inner.commit_draw(event, drafts, now))
            .await
    }

    async fn record_location(&self, entry: WaitlistLocation) -> Result<(), StoreError> {
        self.bounded("record_location", self.inner.record_location(entry))
            .await
    }

    async fn list_locations(&self, event_id: Uuid) -> Result<Vec<WaitlistLocation>, StoreError> {
        self.bounded("list_locations", self.inner.list_locations(event_id))
            .await
    }

    async fn create_invitations(
        &self,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Vec<Invitation>, StoreError> {
        self.bounded(
            "create_invitations",
            self.inner.create_invitations(drafts, now),
        )
        .await
    }

    async fn fetch_invitation(
        &self,
        invitation_id: Uuid,
    ) -> Result<Option<Invitation>, StoreError> {
        self.bounded("fetch_invitation", self.inner.fetch_invitation(invitation_id))
            .await
    }

    async fn replace_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError> {
        self.bounded(
            "replace_invitation",
            self.inner.replace_invitation(invitation),
        )
        .await
    }

    async fn query_invitations(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError> {
        self.bounded("query_invitations", self.inner.query_invitations(filter))
            .await
    }

    async fn create_notification(
        &self,
        draft: NotificationDraft,
        recipients: &[String],
        now: OffsetDateTime,
    ) -> Result<Notification, StoreError> {
        self.bounded(
            "create_notification",
            self.inner.create_notification(draft, recipients, now),
        )
        .await
    }

    async fn fetch_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<(Notification, Vec<String>)>, StoreError> {
        self.bounded(
            "fetch_notification",
            self.inner.fetch_notification(notification_id),
        )
        .await
    }

    async fn mark_notification_deleted(&self, notification_id: Uuid) -> Result<bool, StoreError> {
        self.bounded(
            "mark_notification_deleted",
            self.inner.mark_notification_deleted(notification_id),
        )
        .await
    }

    async fn user_feed(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        self.bounded("user_feed", self.inner.user_feed(user_id))
            .await
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        self.bounded("fetch_user", self.inner.fetch_user(user_id))
            .await
    }

    async fn fetch_users(&self, user_ids: &[String]) -> Result<Vec<User>, StoreError> {
        self.bounded("fetch_users", self.inner.fetch_users(user_ids))
            .await
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        self.bounded("upsert_user", self.inner.upsert_user(user))
            .await
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.inner.changes()
    }
}

#[cfg(test)]
mod timed_tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn slow_calls_time_out() {
        let store = TimedStore::new(Arc::new(MemoryStore::new()), Duration::from_millis(10));

        let slow = store
            .bounded("slow", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert!(matches!(slow, Err(StoreError::Timeout)));

        let fast = store.bounded("fast", async { Ok(1) }).await;
        assert_eq!(fast.unwrap(), 1);
    }
}
