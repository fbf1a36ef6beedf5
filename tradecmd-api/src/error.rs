//! Errors surfaced by the game API client

/// Errors that can occur while talking to the game API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server rejected the operation with a domain error body.
    #[error("{message}")]
    Remote {
        status: u16,
        code: i64,
        message: String,
    },

    /// Non-success status without a readable error body.
    #[error("server returned status {0}")]
    Status(u16),

    #[error("request body cannot be replayed")]
    Unreplayable,

    #[error("not signed in")]
    NotAuthenticated,
}

impl ApiError {
    /// Domain error message reported by the server, if any
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::Remote { message, .. } => Some(message),
            _ => None,
        }
    }

    /// HTTP status code associated with the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } | ApiError::Status(status) => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, ApiError>;
