//! API Server

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
    websocket::WebSocketManager,
};
use crate::{
    config::{ApiConfig, CrashConfig},
    games::{fairness::CrashDistribution, scheduler::EngineHandle},
};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

pub struct ApiServer {
    config: ApiConfig,
    engine: EngineHandle,
    distribution: CrashDistribution,
    metrics_enabled: bool,
}

impl ApiServer {
    pub fn new(config: &CrashConfig, engine: EngineHandle) -> Self {
        Self {
            config: config.api.clone(),
            engine,
            distribution: config.fairness.distribution(),
            metrics_enabled: config.monitoring.enable_metrics,
        }
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(shutdown_signal()).await
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.create_app();
        let addr = self.get_socket_addr()?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Crash API listening on http://{}", addr);
        self.log_server_info();

        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

        info!("API server stopped gracefully");
        Ok(())
    }

    /// Router with the full middleware stack
    pub fn create_app(&self) -> axum::Router {
        let state = Arc::new(AppState {
            engine: self.engine.clone(),
            distribution: self.distribution,
            version: env!("CARGO_PKG_VERSION").to_string(),
            websocket_manager: Arc::new(WebSocketManager::new(self.engine.clone())),
            metrics_enabled: self.metrics_enabled,
        });

        create_router(state)
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))
            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer(self.config.allowed_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_server_info(&self) {
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);
        info!("   Metrics enabled: {}", self.metrics_enabled);
        info!("   GET  /round                  - Live round snapshot");
        info!("   GET  /rounds/:round_id       - Archived round report");
        info!("   POST /bets                   - Place a bet");
        info!("   POST /bets/:bet_id/cashout   - Cash out");
        info!("   POST /fairness/verify        - Verify a seed reveal");
        info!("   GET  /ws                     - Snapshot and event stream");
    }
}

/// Wait for shutdown signal
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
