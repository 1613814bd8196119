//! Cmdlet errors
//!
//! Every failure an invocation can surface. Validation errors are raised
//! before any remote call; the rest come out of the remote client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmdletError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Name resolution or connect failure, rewrapped with the endpoint.
    #[error("unable to reach endpoint {endpoint}: {cause}")]
    Connectivity {
        endpoint: String,
        cause: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service rejected the call. Code and message are the service's own.
    #[error("{code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

impl CmdletError {
    pub fn missing(name: &str) -> Self {
        Self::MissingParameter(name.to_string())
    }

    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors detected before any remote call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperation(_) | Self::MissingParameter(_) | Self::InvalidParameter { .. }
        )
    }

    /// True for network-level failures (nothing reached the service)
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Service error code, when the service sent one
    pub fn service_code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}
