pub mod models;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::modules::extractors::installation::Installation;
use crate::modules::{AppState, Services};
use crate::utils::events::models::Event;
use crate::utils::lottery::errors::LotteryError;

use self::models::DrawOutcome;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/lottery/draw", post(draw_lottery))
        .route("/:id/lottery/complete", post(complete_lottery))
}

/// Close registration and draw now
#[utoipa::path(post, path = "/events/{id}/lottery/draw", tag = "lottery", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = DrawOutcome), (status = 409, description = "Lottery already complete")))]
pub async fn draw_lottery(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<DrawOutcome>, LotteryError> {
    let draw = services
        .lottery
        .draw_now(event_id, &organizer_id, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(draw.into()))
}

/// Mark the lottery finished, no more replacement draws
#[utoipa::path(post, path = "/events/{id}/lottery/complete", tag = "lottery", params(("id" = Uuid, Path, description = "Event id")), responses((status = 200, body = Event)))]
pub async fn complete_lottery(
    Installation(organizer_id): Installation,
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Event>, LotteryError> {
    let event = services
        .lottery
        .complete_lottery_as(event_id, &organizer_id, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(event))
}
