use tokio::net::TcpListener;

use crate::config::DepotConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Depot HTTP server.
pub struct DepotServer {
    config: DepotConfig,
    state: AppState,
}

impl DepotServer {
    /// Open the configured storage and prepare a server.
    pub fn from_config(config: DepotConfig) -> ServerResult<Self> {
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    pub fn new(config: DepotConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &DepotConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.config.server.bind_addr).await?;
        tracing::info!(
            addr = %self.config.server.bind_addr,
            backend = ?self.config.storage.backend,
            "depot server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
