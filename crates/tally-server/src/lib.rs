//! HTTP server for the Tally vote ledger.
//!
//! Exposes casting votes, per-user vote lookup (single and batched), and
//! counter audit over a JSON API. Caller identity is resolved by an
//! [`AuthProvider`] from request headers; the ledger itself never sees
//! credentials.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{AuthProvider, Credentials, Identity, StaticTokenAuth, TrustedHeaderAuth};
pub use config::{AuthConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::TallyServer;
pub use state::AppState;
