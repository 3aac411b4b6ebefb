use std::sync::Arc;
use std::time::Duration;

use magnate::config::Config;
use magnate::services::{EconError, SqliteStore};
use magnate::{api, AppState};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magnate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Starting Magnate server on {}:{}", config.host, config.port);

    let sqlite = Arc::new(SqliteStore::new(&config.database_path)?);
    let state = AppState::build(config, sqlite);

    // The host scheduler: drive the tick engine on a fixed cadence. An
    // overlapping invocation is rejected by the engine and logged here.
    let tick_engine = state.tick.clone();
    let tick_interval = state.config.tick_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(tick_interval));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick fires immediately; skip it so the world
        // gets a full interval before the first simulation step.
        interval.tick().await;
        loop {
            interval.tick().await;
            let engine = tick_engine.clone();
            let result = tokio::task::spawn_blocking(move || engine.execute_tick()).await;
            match result {
                Ok(Ok(record)) => {
                    if !record.step_errors.is_empty() {
                        warn!(
                            "Tick {} finished with {} step errors",
                            record.seq,
                            record.step_errors.len()
                        );
                    }
                }
                Ok(Err(EconError::TickInProgress)) => {
                    warn!("Scheduled tick skipped: previous tick still running");
                }
                Ok(Err(e)) => error!("Tick failed: {}", e),
                Err(e) => error!("Tick task panicked: {}", e),
            }
        }
    });

    // Build the router
    let app = api::router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
