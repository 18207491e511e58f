//! Key store error types.

use thiserror::Error;

use vaultsign_transit::TransitError;

/// Errors that can occur in key store operations.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No key exists under the alias.
    #[error("Key \"{0}\" not found")]
    KeyNotFound(String),

    /// The KMS has not been initialized.
    #[error("Vault is not initialized")]
    NotInitializedVault,

    /// The KMS is sealed.
    #[error("Vault is sealed")]
    Sealed,

    /// The KMS is older than the minimum supported version.
    #[error("Vault version is too old; use version {minimum} or higher")]
    VersionTooOld {
        /// Version reported by the KMS.
        found: String,
        /// Minimum supported version.
        minimum: &'static str,
    },

    /// The key store is read-only over the KMS.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// Transit client error.
    #[error("transit error: {0}")]
    Transit(#[from] TransitError),
}
