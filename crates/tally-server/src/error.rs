use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_ledger::LedgerError;
use tally_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tally_types::TypeError> for ServerError {
    fn from(e: tally_types::TypeError) -> Self {
        Self::Ledger(e.into())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ServerError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Ledger(e) => {
                let status = match e {
                    LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
                    LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                    LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                    LedgerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, e.kind())
            }
            Self::Store(StoreError::TargetExists(_)) => (StatusCode::CONFLICT, "already_exists"),
            Self::Store(StoreError::TargetNotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            Self::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: kind,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
