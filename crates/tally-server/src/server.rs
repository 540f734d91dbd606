use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Tally vote ledger server.
pub struct TallyServer {
    state: Arc<AppState>,
}

impl TallyServer {
    /// Build the server, restoring the configured snapshot if present.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        Ok(Self {
            state: AppState::from_config(config)?,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until Ctrl-C, then persist the snapshot.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.state.config.bind_addr).await?;
        tracing::info!("tally server listening on {}", self.state.config.bind_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("tally server shutting down");
        self.state.persist()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
