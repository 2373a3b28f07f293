pub mod models;

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use uuid::Uuid;

use crate::modules::extractors::installation::{CurrentUser, Installation};
use crate::modules::{AppState, Services};
use crate::utils::notifications::errors::NotificationError;
use crate::utils::notifications::models::Notification;

use self::models::BroadcastMessage;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_feed).post(broadcast))
        .route("/:id", delete(delete_notification))
}

/// Caller's notifications, newest first
#[utoipa::path(get, path = "/notifications", tag = "notifications", responses((status = 200, body = [Notification])))]
pub async fn get_feed(
    Installation(user_id): Installation,
    State(services): State<Services>,
) -> Result<Json<Vec<Notification>>, NotificationError> {
    Ok(Json(services.notifications.feed(&user_id).await?))
}

/// Message one group of an event's entrants
#[utoipa::path(post, path = "/notifications", tag = "notifications", request_body = BroadcastMessage, responses((status = 200, body = Notification, description = "Sent, null when nobody is in the audience"), (status = 403, description = "Caller does not organize the event")))]
pub async fn broadcast(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Json(body): Json<BroadcastMessage>,
) -> Result<Json<Option<Notification>>, NotificationError> {
    let notification = services
        .notifications
        .broadcast(
            body.event_id,
            &organizer_id,
            body.audience,
            &body.title,
            &body.message,
        )
        .await?;
    Ok(Json(notification))
}

/// Retract a notification from every recipient
#[utoipa::path(delete, path = "/notifications/{id}", tag = "notifications", params(("id" = Uuid, Path, description = "Notification id")), responses((status = 200, body = Notification), (status = 403, description = "Only the author or an admin may delete")))]
pub async fn delete_notification(
    CurrentUser(actor): CurrentUser,
    State(services): State<Services>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, NotificationError> {
    Ok(Json(
        services
            .notifications
            .delete(notification_id, &actor)
            .await?,
    ))
}
