//! turnloom - conversational replay and probability-tree server
//!
//! Serves a turn-taking chat on top of a next-token oracle, plus tools to
//! inspect the oracle's continuation tree and rank sampled replies.

mod api;
mod candidates;
mod config;
mod engine;
mod explorer;
mod oracle;
mod protocol;
mod sampler;
mod session;
mod validation;
mod window;

use api::{create_router, AppState};
use config::EngineConfig;
use engine::Engine;
use oracle::{LoggingOracle, RemoteOracle, TokenOracle};
use session::InMemorySessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnloom=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = EngineConfig::from_env();

    // Token oracle
    let remote = RemoteOracle::new(&config.oracle_url, config.context_length)?;
    let oracle: Arc<dyn TokenOracle> = Arc::new(LoggingOracle::new(Arc::new(remote)));
    tracing::info!(
        url = %config.oracle_url,
        context_length = config.context_length,
        seeded = config.seed.is_some(),
        "Token oracle configured"
    );

    // Create application state
    let sessions = Arc::new(InMemorySessionStore::new());
    let state = AppState::new(Engine::new(oracle, sessions, &config));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("turnloom server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
