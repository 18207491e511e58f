//! # vaultsign Transport
//!
//! Transport abstraction between vaultsign and the remote KMS.
//!
//! Provides the [`Transport`] trait implemented by concrete backends (HTTP,
//! in-memory) and the [`Session`] carried into every call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod session;

pub use backend::Transport;
pub use error::TransportError;
pub use session::{AuthToken, Session};
