//! Error types for talking to the RAG backend.

use thiserror::Error;

/// A failed backend call.
///
/// `Network` and `Timeout` mean the backend could not be reached (or did not
/// answer in time); `Server` means it answered and rejected the request.
/// Callers that only need a user-facing sentence can use `Display`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection refused, DNS failure, TLS failure, ...
    #[error("{message}")]
    Network { message: String },

    /// The request did not complete within its timeout
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The backend responded with a non-2xx status
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The backend responded 2xx but the body was not what we expected
    #[error("Unexpected response from backend: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// True when the backend could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    /// HTTP status for application-level failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
