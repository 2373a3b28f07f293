use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::{query, query_as, FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use super::errors::StoreError;
use super::{Change, DocumentStore, CHANGE_FEED_CAPACITY};
use crate::utils::events::models::{Event, EventDraft, GeoPoint, WaitlistLocation};
use crate::utils::invitations::models::{Invitation, InvitationDraft, InvitationFilter};
use crate::utils::notifications::models::{Notification, NotificationDraft};
use crate::utils::users::models::{Role, User};

/// Channel the table triggers in `migrations/` notify on.
pub const CHANGE_CHANNEL: &str = "eventdraw_changes";

#[derive(FromRow)]
struct QLocation {
    event_id: Uuid,
    user_id: String,
    latitude: f64,
    longitude: f64,
    recorded_at: OffsetDateTime,
}

impl From<QLocation> for WaitlistLocation {
    fn from(row: QLocation) -> Self {
        Self {
            event_id: row.event_id,
            user_id: row.user_id,
            location: GeoPoint {
                latitude: row.latitude,
                longitude: row.longitude,
            },
            recorded_at: row.recorded_at,
        }
    }
}

#[derive(FromRow)]
struct QUser {
    user_id: String,
    name: String,
    role: String,
    demoted: bool,
    system_notifications: bool,
    organizer_notifications: bool,
    device_token: Option<String>,
}

impl TryFrom<QUser> for User {
    type Error = StoreError;

    fn try_from(row: QUser) -> Result<Self, Self::Error> {
        let role = Role::try_from(row.role.as_str()).map_err(anyhow::Error::msg)?;
        Ok(Self {
            user_id: row.user_id,
            name: row.name,
            role,
            demoted: row.demoted,
            system_notifications: row.system_notifications,
            organizer_notifications: row.organizer_notifications,
            device_token: row.device_token,
        })
    }
}

/// Postgres backed store. Writes go through the pool, change signals come back
/// from table triggers over `LISTEN`.
pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<Change>,
    listener: JoinHandle<()>,
}

impl PgStore {
    pub async fn new(pool: PgPool) -> Result<Self, StoreError> {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);

        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        debug!("Listening for store changes on `{CHANGE_CHANNEL}`");

        let listener = tokio::spawn(forward_changes(listener, changes.clone()));

        Ok(Self {
            pool,
            changes,
            listener,
        })
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn forward_changes(mut listener: PgListener, changes: broadcast::Sender<Change>) {
    loop {
        let notification = match listener.recv().await {
            Ok(notification) => notification,
            Err(e) => {
                // recv reconnects on the next call
                warn!("Change listener interrupted: {e}");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        match serde_json::from_str::<Change>(notification.payload()) {
            Ok(change) => {
                trace!("Store change {change:?}");
                let _ = changes.send(change);
            }
            Err(e) => error!("Malformed change payload {:?}: {e}", notification.payload()),
        }
    }
}

async fn swap_event(conn: &mut PgConnection, event: &Event) -> Result<bool, StoreError> {
    let affected = query(
        r#"
            UPDATE events
            SET name = $3, description = $4, location_name = $5, geolocation_required = $6,
                max_attendees = $7, max_waiting_list = $8, waiting_list = $9,
                registration_start = $10, registration_end = $11, lottery_complete = $12,
                cancelled_at = $13, updated_at = $14, version = version + 1
            WHERE id = $1 AND version = $2
        "#,
    )
    .bind(event.id)
    .bind(event.version)
    .bind(&event.name)
    .bind(&event.description)
    .bind(&event.location_name)
    .bind(event.geolocation_required)
    .bind(event.max_attendees)
    .bind(event.max_waiting_list)
    .bind(&event.waiting_list)
    .bind(event.registration_start)
    .bind(event.registration_end)
    .bind(event.lottery_complete)
    .bind(event.cancelled_at)
    .bind(event.updated_at)
    .execute(conn)
    .await?
    .rows_affected();

    Ok(affected == 1)
}

async fn insert_invitations(
    conn: &mut PgConnection,
    drafts: Vec<InvitationDraft>,
    now: OffsetDateTime,
) -> Result<Vec<Invitation>, StoreError> {
    let mut invitations = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let invitation = Invitation::new(Uuid::new_v4(), draft, now);
        query(
            r#"
                INSERT INTO invitations (id, event_id, organizer_id, recipient_id, accepted, cancelled, send_time, version)
                VALUES ($1, $2, $3, $4, NULL, FALSE, $5, 0)
            "#,
        )
        .bind(invitation.id)
        .bind(invitation.event_id)
        .bind(&invitation.organizer_id)
        .bind(&invitation.recipient_id)
        .bind(invitation.send_time)
        .execute(&mut *conn)
        .await?;
        invitations.push(invitation);
    }

    trace!("Inserted {} invitations", invitations.len());
    Ok(invitations)
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn create_event(
        &self,
        organizer_id: &str,
        draft: EventDraft,
        now: OffsetDateTime,
    ) -> Result<Event, StoreError> {
        let event = Event::new(Uuid::new_v4(), organizer_id, draft, now);
        query(
            r#"
                INSERT INTO events (id, organizer_id, name, description, location_name, geolocation_required,
                    max_attendees, max_waiting_list, waiting_list, registration_start, registration_end,
                    lottery_complete, created_at, updated_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, FALSE, $12, $12, 0)
            "#,
        )
        .bind(event.id)
        .bind(&event.organizer_id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location_name)
        .bind(event.geolocation_required)
        .bind(event.max_attendees)
        .bind(event.max_waiting_list)
        .bind(&event.waiting_list)
        .bind(event.registration_start)
        .bind(event.registration_end)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(event)
    }

    async fn fetch_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let events = query_as::<_, Event>("SELECT * FROM events ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn replace_event(&self, event: &Event) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        swap_event(&mut conn, event).await
    }

    async fn commit_draw(
        &self,
        event: &Event,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<Invitation>>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !swap_event(&mut tx, event).await? {
            tx.rollback().await?;
            return Ok(None);
        }
        let invitations = insert_invitations(&mut tx, drafts, now).await?;
        tx.commit().await?;

        Ok(Some(invitations))
    }

    async fn record_location(&self, entry: WaitlistLocation) -> Result<(), StoreError> {
        query(
            r#"
                INSERT INTO waitlist_locations (event_id, user_id, latitude, longitude, recorded_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (event_id, user_id) DO UPDATE
                SET latitude = EXCLUDED.latitude, longitude = EXCLUDED.longitude, recorded_at = EXCLUDED.recorded_at
            "#,
        )
        .bind(entry.event_id)
        .bind(&entry.user_id)
        .bind(entry.location.latitude)
        .bind(entry.location.longitude)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_locations(&self, event_id: Uuid) -> Result<Vec<WaitlistLocation>, StoreError> {
        let rows = query_as::<_, QLocation>(
            "SELECT * FROM waitlist_locations WHERE event_id = $1 ORDER BY user_id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WaitlistLocation::from).collect())
    }

    async fn create_invitations(
        &self,
        drafts: Vec<InvitationDraft>,
        now: OffsetDateTime,
    ) -> Result<Vec<Invitation>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let invitations = insert_invitations(&mut tx, drafts, now).await?;
        tx.commit().await?;
        Ok(invitations)
    }

    async fn fetch_invitation(
        &self,
        invitation_id: Uuid,
    ) -> Result<Option<Invitation>, StoreError> {
        let invitation = query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = $1")
            .bind(invitation_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invitation)
    }

    async fn replace_invitation(&self, invitation: &Invitation) -> Result<bool, StoreError> {
        let affected = query(
            r#"
                UPDATE invitations
                SET accepted = $3, cancelled = $4, response_time = $5, cancel_time = $6, version = version + 1
                WHERE id = $1 AND version = $2
            "#,
        )
        .bind(invitation.id)
        .bind(invitation.version)
        .bind(invitation.accepted)
        .bind(invitation.cancelled)
        .bind(invitation.response_time)
        .bind(invitation.cancel_time)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected == 1)
    }

    async fn query_invitations(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<Invitation>, StoreError> {
        let invitations = query_as::<_, Invitation>(
            r#"
                SELECT * FROM invitations
                WHERE ($1::uuid IS NULL OR event_id = $1) AND ($2::text IS NULL OR recipient_id = $2)
                ORDER BY send_time
            "#,
        )
        .bind(filter.event_id)
        .bind(&filter.recipient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    async fn create_notification(
        &self,
        draft: NotificationDraft,
        recipients: &[String],
        now: OffsetDateTime,
    ) -> Result<Notification, StoreError> {
        let notification = Notification::new(Uuid::new_v4(), draft, now);

        let mut tx = self.pool.begin().await?;
        query(
            r#"
                INSERT INTO notifications (id, title, message, event_id, organizer_id, created_at, deleted)
                VALUES ($1, $2, $3, $4, $5, $6, FALSE)
            "#,
        )
        .bind(notification.id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.event_id)
        .bind(&notification.organizer_id)
        .bind(notification.created_at)
        .execute(&mut tx)
        .await?;

        query(
            r#"
                INSERT INTO user_notifications (user_id, notification_id)
                SELECT recipient, $2 FROM UNNEST($1::text[]) AS recipient
            "#,
        )
        .bind(recipients)
        .bind(notification.id)
        .execute(&mut tx)
        .await?;
        tx.commit().await?;

        Ok(notification)
    }

    async fn fetch_notification(
        &self,
        notification_id: Uuid,
    ) -> Result<Option<(Notification, Vec<String>)>, StoreError> {
        let Some(notification) =
            query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
                .bind(notification_id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let recipients: Vec<(String,)> =
            query_as("SELECT user_id FROM user_notifications WHERE notification_id = $1")
                .bind(notification_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some((
            notification,
            recipients.into_iter().map(|(user_id,)| user_id).collect(),
        )))
    }

    async fn mark_notification_deleted(&self, notification_id: Uuid) -> Result<bool, StoreError> {
        let affected = query("UPDATE notifications SET deleted = TRUE WHERE id = $1")
            .bind(notification_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected == 1)
    }

    async fn user_feed(&self, user_id: &str) -> Result<Vec<Notification>, StoreError> {
        let feed = query_as::<_, Notification>(
            r#"
                SELECT n.* FROM notifications n
                JOIN user_notifications un ON un.notification_id = n.id
                WHERE un.user_id = $1 AND NOT n.deleted
                ORDER BY n.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(feed)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        query_as::<_, QUser>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn fetch_users(&self, user_ids: &[String]) -> Result<Vec<User>, StoreError> {
        query_as::<_, QUser>("SELECT * FROM users WHERE user_id = ANY($1)")
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        query(
            r#"
                INSERT INTO users (user_id, name, role, demoted, system_notifications, organizer_notifications, device_token)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (user_id) DO UPDATE
                SET name = EXCLUDED.name, role = EXCLUDED.role, demoted = EXCLUDED.demoted,
                    system_notifications = EXCLUDED.system_notifications,
                    organizer_notifications = EXCLUDED.organizer_notifications,
                    device_token = EXCLUDED.device_token
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.demoted)
        .bind(user.system_notifications)
        .bind(user.organizer_notifications)
        .bind(&user.device_token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }
}
