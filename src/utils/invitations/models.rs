use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{serde::timestamp, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Copied from the event at creation, authorizes `cancel`.
    pub organizer_id: String,
    pub recipient_id: String,
    /// `None` while pending, immutable once set.
    pub accepted: Option<bool>,
    pub cancelled: bool,
    #[serde(with = "timestamp")]
    #[schema(value_type = i64)]
    pub send_time: OffsetDateTime,
    #[serde(with = "timestamp::option", default)]
    #[schema(value_type = Option<i64>)]
    pub response_time: Option<OffsetDateTime>,
    #[serde(with = "timestamp::option", default)]
    #[schema(value_type = Option<i64>)]
    pub cancel_time: Option<OffsetDateTime>,
    pub version: i64,
}

impl Invitation {
    pub fn new(id: Uuid, draft: InvitationDraft, now: OffsetDateTime) -> Self {
        Self {
            id,
            event_id: draft.event_id,
            organizer_id: draft.organizer_id,
            recipient_id: draft.recipient_id,
            accepted: None,
            cancelled: false,
            send_time: now,
            response_time: None,
            cancel_time: None,
            version: 0,
        }
    }

    pub fn state(&self) -> InvitationState {
        if self.cancelled {
            return InvitationState::Cancelled;
        }
        match self.accepted {
            None => InvitationState::Pending,
            Some(true) => InvitationState::Accepted,
            Some(false) => InvitationState::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == InvitationState::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationState {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationDraft {
    pub event_id: Uuid,
    pub organizer_id: String,
    pub recipient_id: String,
}

impl InvitationDraft {
    pub fn new(event_id: Uuid, organizer_id: &str, recipient_id: &str) -> Self {
        Self {
            event_id,
            organizer_id: organizer_id.to_string(),
            recipient_id: recipient_id.to_string(),
        }
    }
}

/// Query predicate for listing and observing invitations. Empty matches all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvitationFilter {
    pub event_id: Option<Uuid>,
    pub recipient_id: Option<String>,
}

impl InvitationFilter {
    pub fn event(event_id: Uuid) -> Self {
        Self {
            event_id: Some(event_id),
            recipient_id: None,
        }
    }

    pub fn recipient(recipient_id: &str) -> Self {
        Self {
            event_id: None,
            recipient_id: Some(recipient_id.to_string()),
        }
    }

    pub fn matches(&self, invitation: &Invitation) -> bool {
        self.event_id.map_or(true, |id| invitation.event_id == id)
            && self
                .recipient_id
                .as_deref()
                .map_or(true, |id| invitation.recipient_id == id)
    }
}

/// Recipient decision on a pending invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Accept,
    Reject,
}

impl Response {
    pub fn accepted(self) -> bool {
        matches!(self, Response::Accept)
    }
}
