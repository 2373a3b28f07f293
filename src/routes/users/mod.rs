use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::modules::extractors::installation::CurrentUser;
use crate::modules::{AppState, Services};
use crate::utils::users::errors::UserError;
use crate::utils::users::models::{User, UserPreferences};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/:id/promote", post(promote_user))
        .route("/:id/demote", post(demote_user))
}

/// Caller's profile, registered on first sight
#[utoipa::path(get, path = "/users/me", tag = "users", responses((status = 200, body = User), (status = 401, description = "Missing installation id")))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Update name, push preferences and device token
#[debug_handler(state = AppState)]
#[utoipa::path(put, path = "/users/me", tag = "users", request_body = UserPreferences, responses((status = 200, body = User)))]
pub async fn update_me(
    CurrentUser(user): CurrentUser,
    State(services): State<Services>,
    Json(preferences): Json<UserPreferences>,
) -> Result<Json<User>, UserError> {
    Ok(Json(
        services
            .users
            .update_preferences(&user.user_id, preferences)
            .await?,
    ))
}

/// Raise a user one role, admin only
#[utoipa::path(post, path = "/users/{id}/promote", tag = "users", params(("id" = String, Path, description = "Installation id")), responses((status = 200, body = User), (status = 403, description = "Caller is not an admin")))]
pub async fn promote_user(
    CurrentUser(admin): CurrentUser,
    State(services): State<Services>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, UserError> {
    Ok(Json(services.users.promote(&admin, &user_id).await?))
}

/// Lower a user one role, admin only
#[utoipa::path(post, path = "/users/{id}/demote", tag = "users", params(("id" = String, Path, description = "Installation id")), responses((status = 200, body = User), (status = 403, description = "Caller is not an admin")))]
pub async fn demote_user(
    CurrentUser(admin): CurrentUser,
    State(services): State<Services>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, UserError> {
    Ok(Json(services.users.demote(&admin, &user_id).await?))
}
