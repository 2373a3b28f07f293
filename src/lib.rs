pub mod app_errors;
pub mod config;
mod doc;
pub mod modules;
pub mod routes;
pub mod store;
pub mod utils;
pub mod validation;

use crate::config::environment::Environment;
use crate::modules::Modules;
use axum::extract::State;
use axum::response::Redirect;
use axum::Router;
use http::{StatusCode, Uri};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const SWAGGER_URI: &str = "/swagger-ui";

pub async fn app(modules: &Modules) -> Router {
    let mut router = Router::new();
    let state = modules.state();

    info!("Environment: {}", state.environment);
    if state.environment.is_dev() {
        info!("Enabling Swagger UI");
        router = router.merge(
            SwaggerUi::new(SWAGGER_URI).url("/api-doc/openapi.json", doc::ApiDoc::openapi()),
        );
    }

    info!("Spawning main router with:\n - state: {state}");

    router
        .nest(
            "/events",
            routes::events::router()
                .merge(routes::waitlist::router())
                .merge(routes::lottery::router())
                .merge(routes::invitations::event_router()),
        )
        .nest("/invitations", routes::invitations::router())
        .nest("/notifications", routes::notifications::router())
        .nest("/users", routes::users::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(
    State(environment): State<Environment>,
    uri: Uri,
) -> Result<Redirect, (StatusCode, &'static str)> {
    if environment.is_dev() && uri.path() == "/" {
        return Ok(Redirect::to(SWAGGER_URI));
    }
    Err((StatusCode::NOT_FOUND, "404 Not Found"))
}
