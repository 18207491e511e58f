//! Transport trait definition.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::session::Session;

/// Transport trait for reaching the KMS.
///
/// Paths are relative to the KMS API root (`transit/keys/my-key`,
/// `sys/health`). Implementations unwrap the KMS response envelope and hand
/// back only its `data` payload. Every method issues exactly one request; no
/// retries happen at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reads the object at `path`. Returns `None` if it does not exist.
    async fn read(&self, session: &Session, path: &str) -> Result<Option<Value>, TransportError>;

    /// Writes `body` to `path`. Returns the response payload, if any.
    async fn write(
        &self,
        session: &Session,
        path: &str,
        body: &Value,
    ) -> Result<Option<Value>, TransportError>;

    /// Lists the entries under `path`, in the order the KMS returns them.
    async fn list(&self, session: &Session, path: &str) -> Result<Vec<String>, TransportError>;

    /// Fetches the KMS health report.
    async fn health(&self, session: &Session) -> Result<Value, TransportError>;
}
