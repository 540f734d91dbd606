use std::sync::Arc;

use axum::http::HeaderMap;
use tally_ledger::{LedgerError, VoteLedger};
use tally_store::{InMemoryStore, StoreSnapshot};

use crate::auth::{bearer_token, provider_from_config, AuthProvider, Credentials, Identity};
use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared state behind every request.
pub struct AppState {
    pub ledger: VoteLedger<InMemoryStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        store: Arc<InMemoryStore>,
        auth: Arc<dyn AuthProvider>,
        config: ServerConfig,
    ) -> Arc<Self> {
        let ledger = VoteLedger::new(store, config.ledger.clone());
        Arc::new(Self {
            ledger,
            auth,
            config,
        })
    }

    /// Build state from config, restoring the snapshot if one exists.
    pub fn from_config(config: ServerConfig) -> ServerResult<Arc<Self>> {
        let store = match &config.snapshot_path {
            Some(path) if path.exists() => {
                let snapshot = StoreSnapshot::load(path)?;
                tracing::info!(
                    path = %path.display(),
                    targets = snapshot.targets.len(),
                    votes = snapshot.votes.len(),
                    "restored snapshot"
                );
                InMemoryStore::from_snapshot(snapshot)?
            }
            _ => InMemoryStore::new(),
        };
        let auth = provider_from_config(&config.auth)?;
        Ok(Self::new(Arc::new(store), auth, config))
    }

    /// Empty in-memory state with the configured auth provider.
    ///
    /// Falls back to an empty token table if the auth config is invalid.
    pub fn in_memory(config: ServerConfig) -> Arc<Self> {
        let auth = provider_from_config(&config.auth).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid auth config, no tokens accepted");
            let empty: Arc<dyn AuthProvider> =
                Arc::new(crate::auth::StaticTokenAuth::new(Default::default()));
            empty
        });
        Self::new(Arc::new(InMemoryStore::new()), auth, config)
    }

    /// Resolve the caller, if any, from request headers.
    pub async fn identify(&self, headers: &HeaderMap) -> ServerResult<Option<Identity>> {
        let credentials =
            Credentials::from_headers(headers, self.config.auth.trusted_header.as_deref());
        self.auth.authenticate(&credentials).await
    }

    /// Allow the request only if it carries the configured admin token.
    pub fn require_admin(&self, headers: &HeaderMap) -> ServerResult<()> {
        match (&self.config.auth.admin_token, bearer_token(headers)) {
            (Some(admin), Some(presented)) if admin == presented => Ok(()),
            _ => Err(LedgerError::Unauthorized.into()),
        }
    }

    /// Write the current store to the configured snapshot path, if any.
    pub fn persist(&self) -> ServerResult<()> {
        if let Some(path) = &self.config.snapshot_path {
            self.ledger.store().snapshot()?.save(path)?;
        }
        Ok(())
    }
}
