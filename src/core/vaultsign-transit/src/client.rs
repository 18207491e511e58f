//! Transit signing client.
//!
//! [`TransitClient`] turns sign, verify, key-read, list and status calls into
//! single transport requests. It holds the authentication session as an
//! `Arc<Session>` behind an async lock: every call takes one snapshot when it
//! starts, so [`Client::authenticate`] never changes the credentials of a
//! call already in flight.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use vaultsign_transport::{AuthToken, Session, Transport};

use crate::error::TransitError;
use crate::key::{KeyMetadata, RemoteKey};
use crate::wire::{self, SignRequest, VaultStatus, VerifyRequest};

/// Mount of the transit engine.
pub const TRANSIT_MOUNT: &str = "transit";

/// Health endpoint.
pub const HEALTH_PATH: &str = "sys/health";

/// Operations the signing layer needs from the KMS.
#[async_trait]
pub trait Client: Send + Sync {
    /// Reads the KMS health report.
    async fn status(&self) -> Result<VaultStatus, TransitError>;

    /// Reads a key; `None` if it does not exist.
    async fn read(&self, name: &str) -> Result<Option<RemoteKey>, TransitError>;

    /// Lists key names in KMS order.
    async fn list(&self) -> Result<Vec<String>, TransitError>;

    /// Signs and returns the raw signature bytes.
    async fn sign(&self, request: &SignRequest) -> Result<Vec<u8>, TransitError>;

    /// Verifies and returns the KMS verdict.
    async fn verify(&self, request: &VerifyRequest) -> Result<bool, TransitError>;

    /// Replaces the session token for all later calls.
    async fn authenticate(&self, token: &str) -> Result<(), TransitError>;
}

struct Inner {
    transport: Arc<dyn Transport>,
    session: RwLock<Arc<Session>>,
}

/// [`Client`] over a [`Transport`].
///
/// Cloning is cheap and clones share the session.
#[derive(Clone)]
pub struct TransitClient {
    inner: Arc<Inner>,
}

impl TransitClient {
    /// Creates an unauthenticated client.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_session(transport, Session::anonymous())
    }

    /// Creates a client authenticated with `token`.
    pub fn with_token(transport: Arc<dyn Transport>, token: &str) -> Self {
        Self::with_session(transport, Session::with_token(AuthToken::new(token)))
    }

    fn with_session(transport: Arc<dyn Transport>, session: Session) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                session: RwLock::new(Arc::new(session)),
            }),
        }
    }

    /// Generation of the current session, bumped on every authentication.
    pub async fn session_generation(&self) -> u64 {
        self.inner.session.read().await.generation()
    }

    async fn session(&self) -> Arc<Session> {
        Arc::clone(&*self.inner.session.read().await)
    }

    fn key_path(action: &str, name: &str) -> Result<String, TransitError> {
        if name.is_empty() {
            return Err(TransitError::InvalidArgument("key name is empty".into()));
        }
        Ok(format!("{TRANSIT_MOUNT}/{action}/{name}"))
    }
}

impl std::fmt::Debug for TransitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl Client for TransitClient {
    async fn status(&self) -> Result<VaultStatus, TransitError> {
        let session = self.session().await;
        let data = self.inner.transport.health(&session).await?;
        wire::parse_status(&data)
    }

    async fn read(&self, name: &str) -> Result<Option<RemoteKey>, TransitError> {
        let path = Self::key_path("keys", name)?;
        let session = self.session().await;

        let Some(data) = self.inner.transport.read(&session, &path).await? else {
            debug!(key = %name, "Key not found");
            return Ok(None);
        };

        let metadata = KeyMetadata::from_value(&data)?;
        let client: Arc<dyn Client> = Arc::new(self.clone());
        RemoteKey::from_metadata(metadata, client).map(Some)
    }

    async fn list(&self) -> Result<Vec<String>, TransitError> {
        let session = self.session().await;
        let keys = self
            .inner
            .transport
            .list(&session, &format!("{TRANSIT_MOUNT}/keys"))
            .await?;

        debug!(count = keys.len(), "Listed transit keys");
        Ok(keys)
    }

    async fn sign(&self, request: &SignRequest) -> Result<Vec<u8>, TransitError> {
        let path = Self::key_path("sign", &request.key_name)?;
        let body = request.to_body().to_value()?;
        let session = self.session().await;

        debug!(
            key = %request.key_name,
            hash = %request.hash_algorithm,
            signature_algorithm = %request.signature_algorithm,
            "Signing"
        );

        let data = self
            .inner
            .transport
            .write(&session, &path, &body)
            .await?
            .ok_or_else(|| TransitError::Protocol("sign response has no data".into()))?;

        Ok(wire::parse_sign_response(&data)?.signature)
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<bool, TransitError> {
        let path = Self::key_path("verify", &request.key_name)?;
        let body = request.to_body().to_value()?;
        let session = self.session().await;

        debug!(key = %request.key_name, hash = %request.hash_algorithm, "Verifying");

        let data = self
            .inner
            .transport
            .write(&session, &path, &body)
            .await?
            .ok_or_else(|| TransitError::Protocol("verify response has no data".into()))?;

        wire::parse_verify_response(&data)
    }

    async fn authenticate(&self, token: &str) -> Result<(), TransitError> {
        if token.is_empty() {
            return Err(TransitError::InvalidArgument("token is empty".into()));
        }

        let mut session = self.inner.session.write().await;
        let next = session.next(AuthToken::new(token));
        let generation = next.generation();
        *session = Arc::new(next);

        info!(generation, "Session token replaced");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultsign_testkit::{KeyFixture, MemoryTransport};
    use vaultsign_transport::TransportError;

    fn setup() -> (MemoryTransport, TransitClient) {
        let transport = MemoryTransport::new()
            .with_key(KeyFixture::rsa_2048())
            .with_key(KeyFixture::ecdsa_p256());
        let client = TransitClient::with_token(Arc::new(transport.clone()), "s.initial");
        (transport, client)
    }

    fn sign_request(key_name: &str) -> SignRequest {
        SignRequest {
            key_name: key_name.into(),
            input: vec![0xAA; 32],
            hash_algorithm: "sha2-256".into(),
            signature_algorithm: String::new(),
            prehashed: true,
            salt_length: String::new(),
        }
    }

    // ========================================================================
    // Read/List Tests
    // ========================================================================

    #[tokio::test]
    async fn test_read_existing_key() {
        let (transport, client) = setup();

        let key = client.read("my-ecdsa-p256").await.unwrap().unwrap();
        assert_eq!(key.name(), "my-ecdsa-p256");
        assert_eq!(key.latest_version(), 1);

        let request = transport.last_request().unwrap();
        assert_eq!(request.path, "transit/keys/my-ecdsa-p256");
        assert_eq!(request.token.as_deref(), Some("s.initial"));
    }

    #[tokio::test]
    async fn test_read_missing_key() {
        let (_, client) = setup();
        assert!(client.read("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_key_name_sends_nothing() {
        let (transport, client) = setup();

        assert!(matches!(
            client.read("").await,
            Err(TransitError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.sign(&sign_request("")).await,
            Err(TransitError::InvalidArgument(_))
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_preserves_order() {
        let transport = MemoryTransport::new()
            .with_key(KeyFixture::ecdsa_p256().name("zeta"))
            .with_key(KeyFixture::rsa_2048().name("alpha"))
            .with_key(KeyFixture::ecdsa_p256().name("mid"));
        let client = TransitClient::new(Arc::new(transport));

        assert_eq!(client.list().await.unwrap(), vec!["zeta", "alpha", "mid"]);
    }

    // ========================================================================
    // Sign/Verify Tests
    // ========================================================================

    #[tokio::test]
    async fn test_sign_parses_version_prefixed_envelope() {
        let (transport, client) = setup();
        transport.set_sign_response(json!({"signature": "vault:v1:1:QUJD", "key_version": 1}));

        let signature = client.sign(&sign_request("my-ecdsa-p256")).await.unwrap();
        assert_eq!(signature, b"ABC");
    }

    #[tokio::test]
    async fn test_sign_rejects_malformed_envelope() {
        let (transport, client) = setup();
        transport.set_sign_response(json!({"signature": "QUJD"}));

        let result = client.sign(&sign_request("my-ecdsa-p256")).await;
        assert!(matches!(result, Err(TransitError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_verify_missing_valid_is_protocol_error() {
        let (transport, client) = setup();
        transport.set_verify_response(json!({}));

        let request = VerifyRequest {
            key_name: "my-rsa-2048".into(),
            input: vec![1, 2, 3],
            hash_algorithm: "sha2-256".into(),
            signature_algorithm: "pkcs1v15".into(),
            prehashed: true,
            signature: b"sig".to_vec(),
        };
        assert!(matches!(
            client.verify(&request).await,
            Err(TransitError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_transport_errors_are_mapped() {
        let (transport, client) = setup();

        transport.fail_next(TransportError::Unavailable("connection refused".into()));
        assert!(matches!(
            client.sign(&sign_request("my-rsa-2048")).await,
            Err(TransitError::RemoteUnavailable(_))
        ));

        transport.fail_next(TransportError::Unauthorized("permission denied".into()));
        assert!(matches!(
            client.list().await,
            Err(TransitError::NotAuthorized(_))
        ));

        transport.fail_next(TransportError::Status {
            code: 400,
            message: "invalid hash algorithm".into(),
        });
        assert!(matches!(
            client.sign(&sign_request("my-rsa-2048")).await,
            Err(TransitError::Rejected { code: 400, .. })
        ));
    }

    // ========================================================================
    // Status Tests
    // ========================================================================

    #[tokio::test]
    async fn test_status() {
        let (transport, client) = setup();
        transport.set_health(json!({"initialized": true, "sealed": true, "version": "1.16.0"}));

        let status = client.status().await.unwrap();
        assert!(status.sealed);
        assert_eq!(status.version, "1.16.0");
        assert_eq!(transport.last_request().unwrap().path, HEALTH_PATH);
    }

    // ========================================================================
    // Session Tests
    // ========================================================================

    #[tokio::test]
    async fn test_authenticate_swaps_session() {
        let (transport, client) = setup();
        assert_eq!(client.session_generation().await, 0);

        client.list().await.unwrap();
        client.authenticate("s.rotated").await.unwrap();
        assert_eq!(client.session_generation().await, 1);
        client.list().await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].token.as_deref(), Some("s.initial"));
        assert_eq!(requests[0].generation, 0);
        assert_eq!(requests[1].token.as_deref(), Some("s.rotated"));
        assert_eq!(requests[1].generation, 1);
    }

    #[tokio::test]
    async fn test_clones_share_session() {
        let (_, client) = setup();
        let other = client.clone();

        other.authenticate("s.shared").await.unwrap();
        assert_eq!(client.session_generation().await, 1);
    }

    #[tokio::test]
    async fn test_key_signs_with_current_session() {
        let (transport, client) = setup();
        let key = client.read("my-rsa-2048").await.unwrap().unwrap();

        client.authenticate("s.later").await.unwrap();
        key.sign(&[0; 32], "sha2-256", "pkcs1v15", "").await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.token.as_deref(), Some("s.later"));
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let (_, client) = setup();
        assert!(matches!(
            client.authenticate("").await,
            Err(TransitError::InvalidArgument(_))
        ));
        assert_eq!(client.session_generation().await, 0);
    }

    #[tokio::test]
    async fn test_anonymous_client_sends_no_token() {
        let transport = MemoryTransport::new().with_key(KeyFixture::rsa_2048());
        let client = TransitClient::new(Arc::new(transport.clone()));

        client.read("my-rsa-2048").await.unwrap();
        assert!(transport.last_request().unwrap().token.is_none());
    }
}
