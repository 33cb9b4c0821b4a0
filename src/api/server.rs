//! API Server

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::ApiConfig;
use crate::factory::RouletteRuntime;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    let default_directive = format!("roulette={level},tower_http={level}", level = log_level);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .try_init();
}

pub struct ApiServer {
    runtime: RouletteRuntime,
}

impl ApiServer {
    pub fn new(runtime: RouletteRuntime) -> Self {
        Self { runtime }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let config = &self.runtime.config;
        let addr: SocketAddr = config.bind_address().parse()?;
        let app = build_app(&self.runtime);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Roulette API listening on http://{}", addr);
        info!("   CORS: {:?}", config.api.allowed_origins);
        info!("   Request timeout: {}s", config.api.request_timeout_secs);
        info!("   Signed requests: {}", config.api.require_signatures);
        info!("   Airdrop: {}", config.api.allow_airdrop);
        info!("   Spin authority: {:?}", config.table.spin_authority);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API Server stopped gracefully");
        Ok(())
    }
}

/// Router with the full middleware stack, shared by the server and tests
pub fn build_app(runtime: &RouletteRuntime) -> axum::Router {
    let config = &runtime.config;
    let state = Arc::new(AppState {
        processor: runtime.processor.clone(),
        ledger: runtime.ledger.clone(),
        authenticator: runtime.authenticator.clone(),
        metrics: runtime.metrics.clone(),
        vrf_public_key: runtime.vrf_public_key.clone(),
        enable_metrics: config.monitoring.enable_metrics,
        allow_airdrop: config.api.allow_airdrop,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    with_middleware(create_router(state), &config.api)
}

fn with_middleware(router: axum::Router, api: &ApiConfig) -> axum::Router {
    router
        // Request ID middleware (first for tracing)
        .layer(axum::middleware::from_fn(request_id_middleware))
        // CORS layer (before timeout to handle preflight)
        .layer(create_cors_layer(api.allowed_origins.clone()))
        .layer(TimeoutLayer::new(Duration::from_secs(api.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
