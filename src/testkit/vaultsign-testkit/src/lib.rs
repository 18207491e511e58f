//! # vaultsign Testkit
//!
//! Shared test support: PEM fixtures, key metadata builders and
//! [`MemoryTransport`], an in-memory KMS that records every request.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod memory;

pub use fixtures::KeyFixture;
pub use memory::{Method, MemoryTransport, RecordedRequest};
