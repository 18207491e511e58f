//! # vaultsign Key Store
//!
//! Presents the transit signing keys of a KMS as a read-only key store:
//! aliases, keys, certificate chains and creation dates.
//!
//! Loading the store checks that the KMS is initialized, unsealed and at
//! least version 1.15.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod store;
pub mod version;

pub use error::KeyStoreError;
pub use store::VaultKeyStore;
