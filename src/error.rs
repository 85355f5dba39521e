use thiserror::Error;

/// Failure of a single backend call, as seen at the gateway boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request could not complete (connection, timeout, unreadable body).
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Non-2xx response. `message` is the body's `message` field, if any.
    #[error("Server rejected request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    ServerRejected {
        status: u16,
        message: Option<String>,
    },

    /// 2xx response whose payload lacks the expected field or shape.
    #[error("Unexpected response shape: {}", .message.as_deref().unwrap_or("missing expected field"))]
    ShapeMismatch { message: Option<String> },
}

impl ApiError {
    /// Message supplied by the server alongside this error, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::NetworkFailure(_) => None,
            ApiError::ServerRejected { message, .. } | ApiError::ShapeMismatch { message } => {
                message.as_deref().filter(|m| !m.is_empty())
            }
        }
    }

    /// The single user-visible string for this failure: the server's message
    /// when it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_owned()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure writing to the session persistence port.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failure of a login or signup attempt. `Display` is the user-facing text.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Invalid(&'static str),

    /// The backend call failed.
    #[error("{0}")]
    Failed(String),

    #[error("Could not save session: {0}")]
    Session(#[from] SessionError),
}
