//! Signing engine error types.

use thiserror::Error;

use vaultsign_crypto::CryptoError;
use vaultsign_transit::TransitError;

/// Errors that can occur while configuring or running a [`crate::SigningEngine`].
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Hash or signature algorithm is not known.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No key was supplied to `init`.
    #[error("Key is null")]
    NullKey,

    /// Key family does not match the engine.
    #[error("{0}")]
    AlgorithmMismatch(String),

    /// `sign` or `verify` called outside the matching mode.
    #[error("Engine not initialized")]
    NotInitialized,

    /// Caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote sign or verify call failed.
    #[error("remote signing failed: {0}")]
    RemoteSigning(#[from] TransitError),
}

impl From<CryptoError> for SignatureError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::UnsupportedAlgorithm(name) => SignatureError::UnsupportedAlgorithm(name),
            other => SignatureError::InvalidArgument(other.to_string()),
        }
    }
}
