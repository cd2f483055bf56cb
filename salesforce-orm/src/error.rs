//! Error types for ORM operations
//!
//! Library operations return [`OrmError`]. Session renewal failures are
//! reported as [`AuthError`] and transport failures as [`TransportError`],
//! both of which convert into `OrmError` with `?`.

use serde_json::Value;
use thiserror::Error;

/// Failure surfaced unchanged from the transport collaborator
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Whatever the remote side returned alongside the failure, if anything
    pub payload: Option<Value>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }

    /// Attach the raw remote payload to this error
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("HTTP request failed: {}", err))
    }
}

/// Login failed; no session was established
#[derive(Debug, Clone, Error)]
#[error("authentication failed: {0}")]
pub struct AuthError(#[source] pub TransportError);

/// Errors returned by record and query operations
#[derive(Debug, Error)]
pub enum OrmError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("model '{0}' is not registered")]
    UnknownModel(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The bulk query reported `done != true`; continuation is not supported
    #[error("query result is incomplete (pagination is not supported)")]
    IncompleteResult,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote service answered but refused the record
    #[error("record rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("cannot {operation} a {model} record without an Id")]
    MissingId {
        model: String,
        operation: &'static str,
    },
}

impl OrmError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse(detail.into())
    }
}

pub type Result<T> = std::result::Result<T, OrmError>;
