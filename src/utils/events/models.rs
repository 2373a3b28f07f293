use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{serde::timestamp, OffsetDateTime};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Coordinates recorded for an entrant when they join a waiting list.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: String,
    pub name: String,
    pub description: Option<String>,
    pub location_name: Option<String>,
    pub geolocation_required: bool,
    /// `None` is unbounded, but the lottery refuses to draw without a positive limit.
    pub max_attendees: Option<i32>,
    /// `None` is unbounded.
    pub max_waiting_list: Option<i32>,
    pub waiting_list: Vec<String>,
    #[serde(with = "timestamp::option", default)]
    #[schema(value_type = Option<i64>)]
    pub registration_start: Option<OffsetDateTime>,
    #[serde(with = "timestamp::option", default)]
    #[schema(value_type = Option<i64>)]
    pub registration_end: Option<OffsetDateTime>,
    pub lottery_complete: bool,
    #[serde(with = "timestamp::option", default)]
    #[schema(value_type = Option<i64>)]
    pub cancelled_at: Option<OffsetDateTime>,
    #[serde(with = "timestamp")]
    #[schema(value_type = i64)]
    pub created_at: OffsetDateTime,
    #[serde(with = "timestamp")]
    #[schema(value_type = i64)]
    pub updated_at: OffsetDateTime,
    pub version: i64,
}

impl Event {
    pub fn new(id: Uuid, organizer_id: &str, draft: EventDraft, now: OffsetDateTime) -> Self {
        Self {
            id,
            organizer_id: organizer_id.to_string(),
            name: draft.name,
            description: draft.description,
            location_name: draft.location_name,
            geolocation_required: draft.geolocation_required,
            max_attendees: draft.max_attendees,
            max_waiting_list: draft.max_waiting_list,
            waiting_list: Vec::new(),
            registration_start: draft.registration_start,
            registration_end: draft.registration_end,
            lottery_complete: false,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_on_waiting_list(&self, user_id: &str) -> bool {
        self.waiting_list.iter().any(|entrant| entrant == user_id)
    }

    pub fn is_waiting_list_full(&self) -> bool {
        match self.max_waiting_list {
            Some(limit) if limit > 0 => self.waiting_list.len() >= limit as usize,
            _ => false,
        }
    }

    pub fn is_organized_by(&self, user_id: &str) -> bool {
        self.organizer_id == user_id
    }

    /// Registration window has closed; a missing end never closes.
    pub fn registration_ended(&self, now: OffsetDateTime) -> bool {
        self.registration_end.map_or(false, |end| now >= end)
    }

    pub fn registration_started(&self, now: OffsetDateTime) -> bool {
        self.registration_start.map_or(true, |start| now >= start)
    }

    /// Refreshes the audit timestamp; every mutation goes through here.
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = now;
    }
}

/// Everything an organizer supplies when creating an event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema, Validate)]
pub struct EventDraft {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 4096))]
    pub description: Option<String>,
    #[validate(length(max = 256))]
    pub location_name: Option<String>,
    #[serde(default)]
    pub geolocation_required: bool,
    #[validate(range(min = 1))]
    pub max_attendees: Option<i32>,
    #[validate(range(min = 1))]
    pub max_waiting_list: Option<i32>,
    #[serde(with = "timestamp::option", default)]
    #[schema(value_type = Option<i64>)]
    pub registration_start: Option<OffsetDateTime>,
    #[serde(with = "timestamp::option", default)]
    #[schema(value_type = Option<i64>)]
    pub registration_end: Option<OffsetDateTime>,
}

/// Best-effort location metadata kept next to, not inside, the waiting list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct WaitlistLocation {
    pub event_id: Uuid,
    pub user_id: String,
    pub location: GeoPoint,
    #[serde(with = "timestamp")]
    #[schema(value_type = i64)]
    pub recorded_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    /// Registration has not started yet.
    NotStarted,
    /// Registration ongoing.
    Open,
    /// Registration closed, the draw is pending or replacements may still run.
    LotteryDone,
    /// `lottery_complete` is set.
    Finished,
}

/// Where a single entrant stands relative to one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrantStatus {
    Waitlist,
    Pending,
    Accepted,
    Rejected,
    NotSelected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct InvitationSummary {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub cancelled: usize,
    pub waitlisted: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct EventView {
    pub event: Event,
    pub phase: EventPhase,
    pub status: Option<EntrantStatus>,
    pub summary: InvitationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct PartitionedEvents {
    pub upcoming: Vec<Event>,
    pub past: Vec<Event>,
}
