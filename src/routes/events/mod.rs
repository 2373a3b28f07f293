pub mod models;

use axum::{
    debug_handler,
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use http::StatusCode;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::modules::extractors::installation::{CurrentUser, Installation};
use crate::modules::{AppState, Services};
use crate::utils::events::errors::EventError;
use crate::utils::events::exe::cancel_event;
use crate::utils::events::models::{Event, EventDraft, EventView};

use self::models::{EventFilter, ListEventsQuery};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_events).post(create_event))
        .route("/:id", get(get_event).delete(delete_event))
}

/// Create event
#[debug_handler(state = AppState)]
#[utoipa::path(post, path = "/events", tag = "events", request_body = EventDraft, responses((status = 201, body = Event, description = "Created event"), (status = 403, description = "Caller is not an organizer")))]
pub async fn create_event(
    CurrentUser(organizer): CurrentUser,
    State(services): State<Services>,
    Json(draft): Json<EventDraft>,
) -> Result<(StatusCode, Json<Event>), EventError> {
    let event = services.events.create(&organizer, draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events
#[utoipa::path(get, path = "/events", tag = "events", params(ListEventsQuery), responses((status = 200, body = [Event], description = "Fetched events")))]
pub async fn get_events(
    State(services): State<Services>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<Event>>, EventError> {
    let events = match query.filter {
        EventFilter::All => services.events.list().await?,
        filter => {
            let split = services.events.partitioned(OffsetDateTime::now_utc()).await?;
            if filter == EventFilter::Upcoming {
                split.upcoming
            } else {
                split.past
            }
        }
    };
    Ok(Json(events))
}

/// Get event with the caller's standing
#[utoipa::path(get, path = "/events/{id}", tag = "events", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = EventView), (status = 404, description = "Event not found")))]
pub async fn get_event(
    viewer: Option<Installation>,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventView>, EventError> {
    let viewer = viewer.map(|Installation(id)| id);
    let view = services
        .events
        .view(event_id, viewer.as_deref(), OffsetDateTime::now_utc())
        .await?;
    Ok(Json(view))
}

/// Cancel event
#[debug_handler(state = AppState)]
#[utoipa::path(delete, path = "/events/{id}", tag = "events", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = Event, description = "Cancelled event"), (status = 403, description = "Caller does not organize the event")))]
pub async fn delete_event(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, EventError> {
    Ok(Json(cancel_event(&services, event_id, &organizer_id).await?))
}
