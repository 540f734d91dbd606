use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tally_ledger::LedgerConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Where the store is loaded from at startup and saved to on shutdown.
    /// `None` keeps everything in memory only.
    pub snapshot_path: Option<PathBuf>,
    /// Upper bound on ids per batched vote lookup.
    pub max_batch_size: usize,
    pub auth: AuthConfig,
    pub ledger: LedgerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7878)),
            snapshot_path: None,
            max_batch_size: 100,
            auth: AuthConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read and validate a TOML config file. Missing keys take defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.ledger.max_attempts == 0 {
            return Err(ServerError::Config("ledger.max_attempts must be at least 1".into()));
        }
        if self.max_batch_size == 0 {
            return Err(ServerError::Config("max_batch_size must be at least 1".into()));
        }
        if self.auth.tokens.values().any(|u| u.trim().is_empty()) {
            return Err(ServerError::Config("auth.tokens maps a token to an empty user id".into()));
        }
        if let Some(admin) = &self.auth.admin_token {
            if admin.trim().is_empty() {
                return Err(ServerError::Config("auth.admin_token must not be empty".into()));
            }
            if self.auth.tokens.contains_key(admin) {
                return Err(ServerError::Config(
                    "auth.admin_token is also a user token".into(),
                ));
            }
        }
        Ok(())
    }
}

/// How callers are identified.
///
/// With `trusted_header` set, an upstream gateway has already authenticated
/// the caller and passes the user id in that header. Otherwise callers send
/// `Authorization: Bearer <token>` and `tokens` maps tokens to user ids.
///
/// Target registration and audit are operator actions and need
/// `Authorization: Bearer <admin_token>`. Without an admin token they are
/// refused for everyone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub trusted_header: Option<String>,
    pub tokens: BTreeMap<String, String>,
    pub admin_token: Option<String>,
}
