//! # vaultsign Crypto
//!
//! Local cryptographic helpers for vaultsign.
//!
//! Private keys never leave the remote KMS, so this crate only covers the
//! work done on the caller's side of a signing operation:
//! - Hash algorithm naming (standard names vs. KMS names)
//! - Incremental digests (SHA-1, SHA-2, SHA-3)
//! - PEM decoding of public keys and certificate chains (`codec`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod digest;
pub mod error;
pub mod hash;

pub use codec::Certificate;
pub use digest::Digest;
pub use error::CryptoError;
pub use hash::{to_remote_name, to_standard_name, HashAlgorithm};
