use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{serde::timestamp, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::events::models::Event;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub event_id: Option<Uuid>,
    /// Set when an organizer wrote the message, `None` for system notifications.
    pub organizer_id: Option<String>,
    #[serde(with = "timestamp")]
    #[schema(value_type = i64)]
    pub created_at: OffsetDateTime,
    /// Soft delete flag, readers must filter on it.
    pub deleted: bool,
}

impl Notification {
    pub fn new(id: Uuid, draft: NotificationDraft, now: OffsetDateTime) -> Self {
        Self {
            id,
            title: draft.title,
            message: draft.message,
            event_id: draft.event_id,
            organizer_id: draft.organizer_id,
            created_at: now,
            deleted: false,
        }
    }

    pub fn is_from_organizer(&self) -> bool {
        self.organizer_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub event_id: Option<Uuid>,
    pub organizer_id: Option<String>,
}

/// Join row linking one recipient to one shared notification body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserNotification {
    pub user_id: String,
    pub notification_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    LotteryWon,
    LotteryLost,
    InvitationCancelled,
    EventCancelled,
    Organizer { title: String, message: String },
}

impl NotificationKind {
    pub fn draft(&self, event: &Event) -> NotificationDraft {
        let (title, message, organizer_id) = match self {
            NotificationKind::LotteryWon => (
                "Won event lottery".to_string(),
                format!("You were selected to attend {}!", event.name),
                None,
            ),
            NotificationKind::LotteryLost => (
                "Lost event lottery".to_string(),
                format!(
                    "A lottery was run for {}. You were not selected this time.",
                    event.name
                ),
                None,
            ),
            NotificationKind::InvitationCancelled => (
                "Invitation cancelled".to_string(),
                format!("Your invitation to {} was cancelled by the organizer.", event.name),
                None,
            ),
            NotificationKind::EventCancelled => (
                "Event cancelled".to_string(),
                format!("{} has been cancelled.", event.name),
                None,
            ),
            NotificationKind::Organizer { title, message } => (
                title.clone(),
                message.clone(),
                Some(event.organizer_id.clone()),
            ),
        };

        NotificationDraft {
            title,
            message,
            event_id: Some(event.id),
            organizer_id,
        }
    }
}

/// What the push channel receives: either a fresh message or a retraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub notification_id: Uuid,
    pub event_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub deleted: bool,
}

impl PushMessage {
    pub fn deliver(notification: &Notification) -> Self {
        Self {
            notification_id: notification.id,
            event_id: notification.event_id,
            title: notification.title.clone(),
            body: notification.message.clone(),
            deleted: false,
        }
    }

    pub fn retract(notification: &Notification) -> Self {
        Self {
            notification_id: notification.id,
            event_id: notification.event_id,
            title: "Deleted".to_string(),
            body: "Deleted notification".to_string(),
            deleted: true,
        }
    }
}

/// Which group of an event's entrants an organizer message goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Waiting entrants that hold no invitation.
    Waitlist,
    /// Pending and accepted invitees.
    Selected,
    /// Invitees that were cancelled or declined.
    Cancelled,
    #[default]
    Everyone,
}
