use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, time::Duration};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    backend::BackendClient,
    config::Config,
    handlers::{self, chat_completions::AppState},
    health::{self, HealthHandle},
    logger::InteractionLogger,
};

/// Start the relay server
///
/// This function:
/// 1. Creates the shared backend client, health handle, and logger
/// 2. Spawns the background health monitor
/// 3. Builds the Axum application
/// 4. Serves requests with graceful shutdown support
pub async fn start_server(config: Config) -> Result<()> {
    let backend = BackendClient::new(&config.backend);
    let health = HealthHandle::new();
    let logger = InteractionLogger::new(config.logging.dir.clone());

    let app_state = AppState {
        backend: backend.clone(),
        health: health.clone(),
        logger,
    };

    // One monitor task for the process lifetime
    let poll_interval = Duration::from_secs(config.health.poll_interval_seconds);
    tokio::spawn({
        let health = health.clone();
        async move {
            health::run_monitor(health, backend, poll_interval).await;
        }
    });

    let app = create_router(app_state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting LLM relay on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root_page))
        .route("/health", get(handlers::health::health_check))
        .route("/backend/health", get(handlers::health::backend_probe))
        .route("/v1/models", get(handlers::models::list_models))
        .route(
            "/v1/chat/completions",
            post(handlers::chat_completions::handle_chat_completions),
        )
        .route(
            "/chat/completions",
            post(handlers::chat_completions::handle_chat_completions),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    #[tokio::test]
    async fn test_create_router() {
        let app_state = AppState {
            backend: BackendClient::new(&BackendConfig::default()),
            health: HealthHandle::new(),
            logger: InteractionLogger::new("logs"),
        };

        let _app = create_router(app_state);
        // Router created successfully - no panic
    }
}
