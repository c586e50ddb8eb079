//! Wander API server entry point
//!
//! Loads configuration from the environment, wires provider clients and
//! optional LLM collaborators into the discovery pipeline, and serves the
//! search API over axum.

mod error;
mod routes;
mod state;
mod validate;

use std::net::SocketAddr;

use axum::Router;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("starting Wander API server");

    let settings = wander_config::Settings::from_env()?;
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    let state = AppState::new(settings).await?;

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::search::router())
        .merge(routes::places::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wander_server=info,wander_pipeline=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}
