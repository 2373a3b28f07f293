use anyhow::Context;
use dotenv::dotenv;
use eventdraw::app;
use eventdraw::modules::Modules;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "eventdraw=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let modules = Modules::load_from_settings().await?;

    if modules.lottery.enabled {
        modules.ticker().spawn();
    } else {
        info!("Scheduled lottery draws disabled");
    }

    info!("Starting server");
    info!("Listening on {}", modules.app.addr);
    axum::Server::bind(&modules.app.addr)
        .serve(
            app(&modules)
                .await
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .context("Failed to run axum server")
}
