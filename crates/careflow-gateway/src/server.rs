//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use careflow_core::config::GatewayConfig;
use careflow_core::traits::Store;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    /// The external record store — the only shared state between requests.
    pub store: Arc<dyn Store>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Webhook inbound — fired by the store on patient record changes
        .route(
            "/api/v1/webhook/record-change",
            post(super::routes::record_change),
        )
        .route(
            "/api/v1/webhook/callback-sync",
            post(super::routes::callback_sync),
        )
        // Scheduler inbound — fired daily by the external timer
        .route("/api/v1/sweep/awaken", post(super::routes::awaken_sweep))
        // Health check
        .route("/health", get(super::routes::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server.
pub async fn start(config: &GatewayConfig, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let app = build_router(AppState { store });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
