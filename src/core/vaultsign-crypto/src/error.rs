//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur in local cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Hash algorithm is not known under the given name.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// PEM input could not be decoded.
    #[error("invalid pem: {0}")]
    InvalidPem(String),

    /// PEM block contents are not the expected DER structure.
    #[error("invalid der: {0}")]
    InvalidDer(String),
}
