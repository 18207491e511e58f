//! # vaultsign Transit
//!
//! Client side of the transit signing protocol.
//!
//! ## Features
//!
//! - Sign and verify digests with keys that never leave the KMS
//! - Immutable remote key model with every key version
//! - Exact wire format: field omission rules and the `vault:` envelope
//! - Re-authentication without disturbing calls in flight
//!
//! ## Signature Format
//!
//! Signatures are returned as `vault:v1:{version}:{base64_signature}`.
//! Only the raw signature bytes are handed back to callers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod key;
pub mod wire;

pub use client::{Client, TransitClient};
pub use error::TransitError;
pub use key::{Capabilities, KeyFamily, KeyMetadata, KeyVersion, RemoteKey};
pub use wire::{SignRequest, VaultStatus, VerifyRequest};
