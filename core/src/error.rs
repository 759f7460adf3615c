//! Error types for the banking API client.
//!
//! # Design
//! Every non-2xx response is normalized into a message taken verbatim from the
//! response body, or an operation-specific default when the body is empty.
//! `Display` for the two rejection variants is exactly that message so callers
//! can show `err.to_string()` directly. The HTTP status is kept alongside and
//! classified into a `FailureKind` for callers that want to branch on it.

use thiserror::Error;

use crate::transport::TransportError;

/// Coarse classification of a rejected request, derived from its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 401: missing, unknown or expired credential.
    Unauthenticated,
    /// 403: authenticated but not permitted.
    Forbidden,
    /// 404
    NotFound,
    /// 5xx
    Server,
    /// Any other non-2xx status (400, 409, 422, ...).
    Rejected,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FailureKind::Unauthenticated,
            403 => FailureKind::Forbidden,
            404 => FailureKind::NotFound,
            500..=599 => FailureKind::Server,
            _ => FailureKind::Rejected,
        }
    }
}

/// Errors returned by `BankClient` parse methods and `BankSession` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected a login attempt.
    #[error("{message}")]
    Authentication { status: u16, message: String },

    /// The backend answered an operation other than login with a non-2xx status.
    #[error("{message}")]
    Request {
        kind: FailureKind,
        status: u16,
        message: String,
    },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured base address cannot be used to build request URLs.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A successful response body did not match the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// The normalized message for rejected requests, `None` for other variants.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Authentication { message, .. } | ApiError::Request { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { status, .. } | ApiError::Request { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            ApiError::Request { kind, .. } => Some(*kind),
            ApiError::Authentication { .. } => Some(FailureKind::Unauthenticated),
            _ => None,
        }
    }
}
