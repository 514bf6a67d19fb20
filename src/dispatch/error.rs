//! Remote dispatch error types

use thiserror::Error;

/// Dispatch failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub message: String,
}

impl DispatchError {
    pub fn new(kind: DispatchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Timeout, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::ServerError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::InvalidResponse, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Unavailable, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Unknown, message)
    }
}

/// Error classification, used for diagnostics only.
///
/// Every kind ends the same way for the user (an apology turn); the kind
/// tells operators whether the backend, the network or the payload is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    /// Connection failures
    Network,
    /// Request exceeded the client timeout
    Timeout,
    /// 429 from the backend
    RateLimit,
    /// 5xx from the backend
    ServerError,
    /// 400 from the backend
    InvalidRequest,
    /// Body could not be decoded, or carried no reply text
    InvalidResponse,
    /// No backend configured
    Unavailable,
    Unknown,
}

impl DispatchErrorKind {
    /// Whether the backend itself (rather than this client) is at fault
    pub fn is_backend_fault(self) -> bool {
        matches!(
            self,
            Self::ServerError | Self::RateLimit | Self::InvalidResponse
        )
    }
}
