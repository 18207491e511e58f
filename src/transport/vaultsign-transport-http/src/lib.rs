//! # vaultsign HTTP Transport
//!
//! [`HttpTransport`] reaches the KMS over HTTP(S) with reqwest (rustls).
//!
//! - Paths are mounted under `/v1/`
//! - The session token travels in `X-Vault-Token`
//! - Response envelopes are unwrapped to their `data` payload
//! - `LIST` is issued as `GET ?list=true`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod http;

pub use config::HttpTransportConfig;
pub use http::HttpTransport;
