//! Transport error types.

use thiserror::Error;

/// Errors that can occur while talking to the KMS.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The KMS could not be reached or answered with a server error.
    #[error("kms unavailable: {0}")]
    Unavailable(String),

    /// The session credentials were rejected.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// The KMS answered with an unexpected status.
    #[error("kms returned status {code}: {message}")]
    Status {
        /// HTTP-style status code.
        code: u16,
        /// Error text reported by the KMS.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}
