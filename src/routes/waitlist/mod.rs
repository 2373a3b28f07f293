pub mod models;

use axum::{
    debug_handler,
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::modules::extractors::installation::{CurrentUser, Installation};
use crate::modules::{AppState, Services};
use crate::utils::events::models::{Event, WaitlistLocation};
use crate::utils::waitlist::errors::WaitlistError;

use self::models::{JoinWaitlist, WaitlistSize};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:id/waitlist",
            get(get_waitlist_size)
                .post(join_waitlist)
                .delete(leave_waitlist),
        )
        .route("/:id/waitlist/locations", get(get_waitlist_locations))
}

/// Join the waiting list
#[debug_handler(state = AppState)]
#[utoipa::path(post, path = "/events/{id}/waitlist", tag = "waitlist", params(("id" = Uuid, Path, description = "Event id")), request_body = JoinWaitlist, responses((status = 200, body = Event, description = "Joined"), (status = 409, description = "Already on the list, list full or registration closed")))]
pub async fn join_waitlist(
    CurrentUser(user): CurrentUser,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<JoinWaitlist>,
) -> Result<Json<Event>, WaitlistError> {
    let event = services
        .waitlist
        .join(event_id, &user.user_id, body.location)
        .await?;
    Ok(Json(event))
}

/// Leave the waiting list
#[utoipa::path(delete, path = "/events/{id}/waitlist", tag = "waitlist", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = Event, description = "Left"), (status = 404, description = "Not on the list")))]
pub async fn leave_waitlist(
    Installation(user_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, WaitlistError> {
    Ok(Json(services.waitlist.leave(event_id, &user_id).await?))
}

/// Waiting list size
#[utoipa::path(get, path = "/events/{id}/waitlist", tag = "waitlist", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = WaitlistSize)))]
pub async fn get_waitlist_size(
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<WaitlistSize>, WaitlistError> {
    let size = services.waitlist.size(event_id).await?;
    Ok(Json(WaitlistSize { event_id, size }))
}

/// Join locations, organizer only
#[utoipa::path(get, path = "/events/{id}/waitlist/locations", tag = "waitlist", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = [WaitlistLocation]), (status = 403, description = "Caller does not organize the event")))]
pub async fn get_waitlist_locations(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<WaitlistLocation>>, WaitlistError> {
    Ok(Json(
        services.waitlist.locations(event_id, &organizer_id).await?,
    ))
}
