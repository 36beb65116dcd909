use thiserror::Error;

use crate::api::types::ValidationErrors;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid runner URL '{url}': {details}")]
    InvalidUrl { url: String, details: String },

    #[error("Authentication failed: {details}")]
    AuthenticationFailed { details: String },

    #[error("Rate limited by runner: {details}")]
    RateLimited { details: String },

    #[error("Runner rejected the request (Status: {status_code}): {details}")]
    Rejected { status_code: u16, details: String },

    #[error("Runner server error (Status: {status_code}): {details}")]
    ServerError { status_code: u16, details: String },

    #[error("Unexpected runner response (Status: {status_code}): {details}")]
    Unknown { status_code: u16, details: String },

    #[error("Failed to parse runner response: {details}")]
    ResponseParsingError { details: String },

    #[error("Invalid run: {0}")]
    Validation(#[from] ValidationErrors),
}

impl ApiError {
    /// Maps a non-success status and its body text onto an error variant.
    pub fn from_status(status_code: u16, details: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationFailed { details },
            429 => Self::RateLimited { details },
            400..=499 => Self::Rejected {
                status_code,
                details,
            },
            500..=599 => Self::ServerError {
                status_code,
                details,
            },
            _ => Self::Unknown {
                status_code,
                details,
            },
        }
    }
}
