//! Client Error Types
//!
//! The server reports two kinds of failure: a declared one (`success:false`
//! with an optional message) and everything that keeps a usable JSON body
//! from arriving at all. Callers treat both the same way, but keep the
//! server's message when there is one.

use thiserror::Error;

/// Errors that can occur when talking to the check-in server
#[derive(Error, Debug)]
pub enum ClientError {
    /// Server answered `success: false`
    #[error("{}", .message.as_deref().unwrap_or("request declined by server"))]
    Declared { message: Option<String> },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Check-in server unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    /// Body was not the JSON the endpoint promises
    #[error("Unexpected response (HTTP {status}): {error}")]
    Decode { status: u16, error: String },

    #[error("Invalid URL {url}: {error}")]
    InvalidUrl { url: String, error: String },
}

impl ClientError {
    pub fn declared(message: Option<&str>) -> Self {
        ClientError::Declared {
            message: message.map(str::to_string),
        }
    }

    /// Whether the server itself reported the failure
    pub fn is_declared(&self) -> bool {
        matches!(self, ClientError::Declared { .. })
    }

    /// Server-supplied message of a declared failure
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Declared { message } => message.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Unavailable
        } else {
            ClientError::Request(e)
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
