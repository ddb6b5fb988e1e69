//! Unified error handling for the client.

use roster_engine::{Collection, RemoteError};

/// HTTP adapter error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Service error: {0}")]
    Api(String),

    #[error("Unexpected reply: {0}")]
    Shape(String),
}

impl ClientError {
    /// Map onto the engine's remote error for a request against `collection`.
    pub fn into_remote(self, collection: Collection) -> RemoteError {
        match self {
            ClientError::Http(e) => RemoteError::Unreachable(e.to_string()),
            ClientError::Json(e) => RemoteError::Malformed(e.to_string()),
            ClientError::Status { status, message } => {
                RemoteError::rejected(collection, format!("HTTP {status}: {message}"))
            }
            ClientError::Api(message) => RemoteError::rejected(collection, message),
            ClientError::Shape(message) => RemoteError::Malformed(message),
        }
    }
}

/// Result type alias for the HTTP adapter.
pub type Result<T> = std::result::Result<T, ClientError>;
