//! Oracle error types

use thiserror::Error;

/// Oracle error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OracleError {
    pub kind: OracleErrorKind,
    pub message: String,
}

impl OracleError {
    pub fn new(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::Network, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::ServerError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(OracleErrorKind::InvalidResponse, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleErrorKind {
    /// Connection refused, timeouts
    Network,
    /// Inference server returned 5xx
    ServerError,
    /// Inference server rejected the input (4xx)
    InvalidRequest,
    /// Body could not be parsed, or violates the distribution contract
    InvalidResponse,
}

impl OracleErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::ServerError)
    }
}
