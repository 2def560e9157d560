//! Error type shared by every vault API operation.
//!
//! Local validation, transport failures, server rejections and unexpected
//! response shapes all surface as one `ApiError` whose `Display` output is
//! the human-readable message shown to the user.

use reqwest::StatusCode;
use thiserror::Error;

/// Fallback message when neither the body nor the status carries one.
pub const GENERIC_FAILURE: &str = "API request failed";

/// Message fragments the backend uses when the vault context is rejected.
const UNAUTHORIZED_MARKERS: [&str; 3] = ["Invalid PIN", "Unauthorized", "Invalid vault name"];

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required field was missing or malformed; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// The request never produced an HTTP response.
    #[error("{0}")]
    Network(String),

    /// The backend rejected the request, with a non-2xx status or an
    /// explicit failure body.
    #[error("{message}")]
    Server { status: StatusCode, message: String },

    /// The response did not have the expected shape.
    #[error("{0}")]
    Parse(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Whether the backend rejected the vault context itself.
    ///
    /// Callers listing files use this to end the session.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ApiError::Server { status, message } => {
                *status == StatusCode::UNAUTHORIZED
                    || *status == StatusCode::FORBIDDEN
                    || UNAUTHORIZED_MARKERS.iter().any(|m| message.contains(m))
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(format!("Failed to parse response: {}", err))
        } else {
            ApiError::Network(format!("Network error: {}", err))
        }
    }
}
