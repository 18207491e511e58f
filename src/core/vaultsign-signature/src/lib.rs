//! # vaultsign Signature
//!
//! Standard digest-then-sign interface over keys held by a remote KMS.
//!
//! Data is hashed locally; only the digest travels to the KMS, which signs
//! or verifies it with the private key it never releases.
//!
//! ## Supported Algorithms
//!
//! | Family | Hashes | Padding |
//! |--------|--------|---------|
//! | RSA | SHA-1, SHA-224, SHA-256, SHA-384, SHA-512 | PKCS#1 v1.5, PSS |
//! | ECDSA | SHA-1 .. SHA-512, SHA3-224 .. SHA3-512 | - |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod algorithms;
pub mod engine;
pub mod error;

pub use algorithms::{Padding, SaltLength, SignatureAlgorithm};
pub use engine::{Purpose, SigningEngine};
pub use error::SignatureError;
