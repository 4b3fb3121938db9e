//! Error handling for the remote service clients

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// Connection refused, timeout, or any other IO-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("HTTP error with status {status}: {message}")]
    Http { status: u16, message: String },

    /// The body could not be parsed or failed validation.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Build from a ureq error, reading the body of status errors.
    pub fn from_ureq(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(404, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "Failed to read response text".to_string());
                ServiceError::NotFound(message)
            }
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "Failed to read response text".to_string());
                ServiceError::Http { status, message }
            }
            ureq::Error::Transport(transport) => ServiceError::Transport(transport.to_string()),
        }
    }

    /// Whether polling should simply try again on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Transport(_) | ServiceError::InvalidResponse(_) => true,
            ServiceError::Http { status, .. } => *status == 429 || *status >= 500,
            ServiceError::NotFound(_) => false,
        }
    }
}
