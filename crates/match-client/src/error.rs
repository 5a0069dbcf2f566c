//! Errors that can occur when talking to the scoring services.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The HTTP client itself could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(reqwest::Error),

    /// The service could not be reached (connect error, timeout, ...)
    #[error("Failed to reach {service}: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{service} returned status {status}")]
    Service { service: &'static str, status: u16 },

    /// The service answered 2xx but the body was malformed or inconsistent
    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
