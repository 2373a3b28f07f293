pub mod models;

use axum::{
    debug_handler,
    extract::{Path, State},
    response::sse::{self, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::{Stream, StreamExt};
use http::StatusCode;
use uuid::Uuid;

use crate::app_errors::AppError;
use crate::modules::extractors::installation::Installation;
use crate::modules::{AppState, Services};
use crate::utils::events::summarize;
use crate::utils::invitations::errors::InvitationError;
use crate::utils::invitations::exe::{
    cancel_invitation, event_invitations, invite_recipients, reject_invitation,
};
use crate::utils::invitations::models::{Invitation, InvitationFilter};

use self::models::{CreateInvites, CreatedInvites};

/// Routes addressed by invitation id, nested under `/invitations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_my_invitations))
        .route("/:id", get(get_invitation))
        .route("/:id/accept", post(accept_invitation))
        .route("/:id/reject", post(decline_invitation))
        .route("/:id/cancel", post(withdraw_invitation))
}

/// Routes addressed by event id, merged into `/events`.
pub fn event_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:id/invitations",
            get(get_event_invitations).post(create_invitations),
        )
        .route("/:id/invitations/summary", get(stream_invitation_summary))
}

/// Invitations addressed to the caller
#[utoipa::path(get, path = "/invitations", tag = "invitations", responses((status = 200, body = [Invitation])))]
pub async fn get_my_invitations(
    Installation(user_id): Installation,
    State(services): State<Services>,
) -> Result<Json<Vec<Invitation>>, InvitationError> {
    Ok(Json(
        services
            .invitations
            .list(&InvitationFilter::recipient(&user_id))
            .await?,
    ))
}

/// Single invitation, visible to its recipient and organizer
#[utoipa::path(get, path = "/invitations/{id}", tag = "invitations", params(("id" = Uuid, Path, description = "Invitation id")), responses((status = 200, body = Invitation), (status = 404, description = "Invitation not found")))]
pub async fn get_invitation(
    Installation(user_id): Installation,
    State(services): State<Services>,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<Invitation>, InvitationError> {
    let invitation = services.invitations.get(invitation_id).await?;
    if invitation.recipient_id != user_id && invitation.organizer_id != user_id {
        return Err(InvitationError::Forbidden);
    }
    Ok(Json(invitation))
}

/// Accept invitation
#[debug_handler(state = AppState)]
#[utoipa::path(post, path = "/invitations/{id}/accept", tag = "invitations", params(("id" = Uuid, Path, description = "Invitation id")), responses((status = 200, body = Invitation, description = "Accepted"), (status = 409, description = "Already responded"), (status = 410, description = "Invitation was cancelled")))]
pub async fn accept_invitation(
    Installation(user_id): Installation,
    State(services): State<Services>,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<Invitation>, InvitationError> {
    Ok(Json(
        services.invitations.accept(invitation_id, &user_id).await?,
    ))
}

/// Reject invitation, a replacement is drawn right away
#[utoipa::path(post, path = "/invitations/{id}/reject", tag = "invitations", params(("id" = Uuid, Path, description = "Invitation id")), responses((status = 200, body = Invitation, description = "Rejected"), (status = 409, description = "Already responded"), (status = 410, description = "Invitation was cancelled")))]
pub async fn decline_invitation(
    Installation(user_id): Installation,
    State(services): State<Services>,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<Invitation>, InvitationError> {
    Ok(Json(
        reject_invitation(&services, invitation_id, &user_id).await?,
    ))
}

/// Cancel a pending invitation, organizer only
#[utoipa::path(post, path = "/invitations/{id}/cancel", tag = "invitations", params(("id" = Uuid, Path, description = "Invitation id")), responses((status = 200, body = Invitation, description = "Cancelled"), (status = 403, description = "Caller does not organize the event")))]
pub async fn withdraw_invitation(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<Invitation>, InvitationError> {
    Ok(Json(
        cancel_invitation(&services, invitation_id, &organizer_id).await?,
    ))
}

/// Invitations of an event, organizer only
#[utoipa::path(get, path = "/events/{id}/invitations", tag = "invitations", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = [Invitation])))]
pub async fn get_event_invitations(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<Invitation>>, InvitationError> {
    Ok(Json(
        event_invitations(&services, event_id, &organizer_id).await?,
    ))
}

/// Invite entrants directly
#[debug_handler(state = AppState)]
#[utoipa::path(post, path = "/events/{id}/invitations", tag = "invitations", params(("id" = Uuid, Path, description = "Event id")), request_body = CreateInvites, responses((status = 201, body = CreatedInvites)))]
pub async fn create_invitations(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<CreateInvites>,
) -> Result<(StatusCode, Json<CreatedInvites>), InvitationError> {
    let invitation_ids =
        invite_recipients(&services, event_id, &organizer_id, &body.recipient_ids).await?;
    Ok((StatusCode::CREATED, Json(CreatedInvites { invitation_ids })))
}

/// Live invitation counts as server-sent `summary` events, organizer only
#[utoipa::path(get, path = "/events/{id}/invitations/summary", tag = "invitations", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, description = "text/event-stream of InvitationSummary")))]
pub async fn stream_invitation_summary(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<sse::Event, axum::Error>>>, AppError> {
    let event = services.events.get(event_id).await?;
    if !event.is_organized_by(&organizer_id) {
        return Err(InvitationError::Forbidden.into());
    }

    let store = services.store.clone();
    let summaries = services
        .invitations
        .observe_event_invitations(event_id)
        .into_stream()
        .then(move |snapshot| {
            let store = store.clone();
            let fallback = event.clone();
            async move {
                let invitations = match snapshot {
                    Ok(invitations) => invitations,
                    Err(e) => return Ok(sse::Event::default().event("error").data(e.to_string())),
                };
                // waitlist size moves independently of invitations
                let event = match store.fetch_event(event_id).await {
                    Ok(Some(event)) => event,
                    _ => fallback,
                };
                sse::Event::default()
                    .event("summary")
                    .json_data(summarize(&event, &invitations))
                    .map_err(axum::Error::new)
            }
        });

    Ok(Sse::new(summaries).keep_alive(KeepAlive::default()))
}
