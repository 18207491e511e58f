//! Transit client error types.

use thiserror::Error;

use vaultsign_transport::TransportError;

/// Errors that can occur in the transit signing client and key model.
#[derive(Debug, Error)]
pub enum TransitError {
    /// A caller-supplied argument was rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The KMS response did not have the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The KMS could not be reached.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The KMS rejected the session credentials.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The KMS refused the request.
    #[error("kms rejected request ({code}): {message}")]
    Rejected {
        /// Status code reported by the transport.
        code: u16,
        /// Error text reported by the KMS.
        message: String,
    },

    /// Key type is neither RSA nor EC.
    #[error("key type not supported (only rsa and ecdsa): {0}")]
    UnsupportedKeyType(String),

    /// Key versions or public key material are missing or malformed.
    #[error("key material error: {0}")]
    KeyMaterial(String),

    /// Key capabilities do not allow the operation.
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),
}

impl From<TransportError> for TransitError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Unavailable(msg) => TransitError::RemoteUnavailable(msg),
            TransportError::Unauthorized(msg) => TransitError::NotAuthorized(msg),
            TransportError::Status { code, message } => TransitError::Rejected { code, message },
            TransportError::Malformed(msg) => TransitError::Protocol(msg),
        }
    }
}
