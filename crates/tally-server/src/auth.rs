use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use tally_types::UserId;

use crate::config::AuthConfig;
use crate::error::{ServerError, ServerResult};

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

impl Identity {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Credentials as presented on a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    /// A user id asserted by a trusted upstream gateway.
    Asserted(String),
    Anonymous,
}

impl Credentials {
    /// Pull credentials out of request headers.
    ///
    /// When `trusted_header` is configured and present it wins; otherwise an
    /// `Authorization: Bearer` header is used. Anything else is anonymous.
    pub fn from_headers(headers: &HeaderMap, trusted_header: Option<&str>) -> Self {
        if let Some(name) = trusted_header {
            if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                return Self::Asserted(value.trim().to_string());
            }
        }
        bearer_token(headers)
            .map(|token| Self::Bearer(token.to_string()))
            .unwrap_or(Self::Anonymous)
    }
}

/// The token from an `Authorization: Bearer` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Resolves credentials to an identity.
///
/// `Ok(None)` means the caller is anonymous or presented credentials that
/// do not map to a user; the ledger decides whether that is acceptable.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Option<Identity>>;
}

/// Fixed bearer-token table, loaded from config.
pub struct StaticTokenAuth {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenAuth {
    pub fn new(tokens: HashMap<String, UserId>) -> Self {
        Self { tokens }
    }

    pub fn from_config(config: &AuthConfig) -> ServerResult<Self> {
        let tokens = config
            .tokens
            .iter()
            .map(|(token, user)| {
                UserId::parse(user)
                    .map(|id| (token.clone(), id))
                    .map_err(|e| ServerError::Config(e.to_string()))
            })
            .collect::<ServerResult<HashMap<_, _>>>()?;
        Ok(Self::new(tokens))
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Option<Identity>> {
        match credentials {
            Credentials::Bearer(token) => Ok(self.tokens.get(token).cloned().map(Identity::new)),
            Credentials::Asserted(_) | Credentials::Anonymous => Ok(None),
        }
    }
}

/// Trusts the user id asserted by an upstream gateway.
pub struct TrustedHeaderAuth;

#[async_trait]
impl AuthProvider for TrustedHeaderAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Option<Identity>> {
        match credentials {
            Credentials::Asserted(raw) => Ok(UserId::parse(raw).ok().map(Identity::new)),
            Credentials::Bearer(_) | Credentials::Anonymous => Ok(None),
        }
    }
}

/// Pick the provider matching the auth config.
pub fn provider_from_config(config: &AuthConfig) -> ServerResult<Arc<dyn AuthProvider>> {
    if config.trusted_header.is_some() {
        Ok(Arc::new(TrustedHeaderAuth))
    } else {
        Ok(Arc::new(StaticTokenAuth::from_config(config)?))
    }
}
