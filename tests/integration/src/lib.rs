//! End-to-end tests for vaultsign over HTTP.
//!
//! [`MockKms`] serves the slice of the KMS HTTP API the signing layer uses:
//! health, key listing, key reads, sign and verify. Signatures are
//! deterministic tags over the key name, hash and input, so verify can
//! check them without real key material.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use vaultsign_keystore::VaultKeyStore;
use vaultsign_testkit::KeyFixture;
use vaultsign_transit::TransitClient;
use vaultsign_transport_http::{HttpTransport, HttpTransportConfig};

/// Token the mock accepts.
pub const ROOT_TOKEN: &str = "s.integration-root";

// ============================================================================
// Mock KMS State
// ============================================================================

#[derive(Debug)]
struct MockState {
    keys: Vec<(String, Value)>,
    initialized: bool,
    sealed: bool,
    version: String,
    failure: Option<u16>,
    writes: Vec<(String, Value)>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Signature bytes the mock produces for a sign request.
pub fn mock_signature(key: &str, hash: &str, input: &str) -> Vec<u8> {
    format!("{key}|{hash}|{input}").into_bytes()
}

fn errors(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "errors": [message] }))).into_response()
}

/// Applies injected failures and the token check.
fn admit(state: &Shared, headers: &HeaderMap) -> Result<(), Response> {
    let state = lock(state);

    if let Some(code) = state.failure {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err(errors(status, "injected failure"));
    }
    if state.sealed {
        return Err(errors(StatusCode::SERVICE_UNAVAILABLE, "Vault is sealed"));
    }

    let token = headers.get("X-Vault-Token").and_then(|v| v.to_str().ok());
    if token != Some(ROOT_TOKEN) {
        return Err(errors(StatusCode::FORBIDDEN, "permission denied"));
    }

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health(State(state): State<Shared>) -> Response {
    let state = lock(&state);

    if let Some(code) = state.failure {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return errors(status, "injected failure");
    }

    Json(json!({
        "initialized": state.initialized,
        "sealed": state.sealed,
        "standby": false,
        "version": state.version,
        "cluster_name": "vault-cluster-mock",
    }))
    .into_response()
}

async fn list_keys(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = admit(&state, &headers) {
        return response;
    }
    if query.get("list").map(String::as_str) != Some("true") {
        return errors(StatusCode::METHOD_NOT_ALLOWED, "unsupported operation");
    }

    let state = lock(&state);
    if state.keys.is_empty() {
        return (StatusCode::NOT_FOUND, Json(json!({ "errors": [] }))).into_response();
    }

    let keys: Vec<&str> = state.keys.iter().map(|(name, _)| name.as_str()).collect();
    Json(json!({ "data": { "keys": keys } })).into_response()
}

async fn read_key(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    if let Err(response) = admit(&state, &headers) {
        return response;
    }

    let state = lock(&state);
    match state.keys.iter().find(|(n, _)| *n == name) {
        Some((_, metadata)) => Json(json!({ "data": metadata })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "errors": [] }))).into_response(),
    }
}

async fn sign(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = admit(&state, &headers) {
        return response;
    }

    let mut state = lock(&state);
    state.writes.push((format!("transit/sign/{name}"), body.clone()));

    let Some(latest) = state
        .keys
        .iter()
        .find(|(n, _)| *n == name)
        .and_then(|(_, meta)| meta.get("latest_version").and_then(Value::as_u64))
    else {
        return errors(StatusCode::BAD_REQUEST, "signing key not found");
    };

    let hash = body["hash_algorithm"].as_str().unwrap_or("sha2-256");
    let input = body["input"].as_str().unwrap_or_default();
    let signature = BASE64.encode(mock_signature(&name, hash, input));

    Json(json!({
        "data": {
            "signature": format!("vault:v{latest}:{signature}"),
            "key_version": latest,
        }
    }))
    .into_response()
}

async fn verify(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = admit(&state, &headers) {
        return response;
    }

    let mut state = lock(&state);
    state.writes.push((format!("transit/verify/{name}"), body.clone()));

    if !state.keys.iter().any(|(n, _)| *n == name) {
        return errors(StatusCode::BAD_REQUEST, "signature verification key not found");
    }

    let hash = body["hash_algorithm"].as_str().unwrap_or("sha2-256");
    let input = body["input"].as_str().unwrap_or_default();
    let Some(encoded) = body["signature"].as_str().and_then(|s| s.rsplit(':').next()) else {
        return errors(StatusCode::BAD_REQUEST, "missing signature");
    };
    let Ok(signature) = BASE64.decode(encoded) else {
        return errors(StatusCode::BAD_REQUEST, "invalid signature encoding");
    };

    let valid = signature == mock_signature(&name, hash, input);
    Json(json!({ "data": { "valid": valid } })).into_response()
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/v1/sys/health", get(health))
        .route("/v1/transit/keys", get(list_keys))
        .route("/v1/transit/keys/{name}", get(read_key))
        .route("/v1/transit/sign/{name}", post(sign))
        .route("/v1/transit/verify/{name}", post(verify))
        .with_state(state)
}

// ============================================================================
// Mock KMS
// ============================================================================

/// In-process KMS bound to an ephemeral local port.
pub struct MockKms {
    state: Shared,
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl MockKms {
    /// Starts an initialized, unsealed 1.15.2 KMS holding `keys` in order.
    pub async fn start(keys: Vec<KeyFixture>) -> Result<Self> {
        let state = Arc::new(Mutex::new(MockState {
            keys: keys
                .iter()
                .map(|fixture| (fixture.name.clone(), fixture.to_metadata()))
                .collect(),
            initialized: true,
            sealed: false,
            version: "1.15.2".into(),
            failure: None,
            writes: Vec::new(),
        }));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind mock KMS")?;
        let addr = listener.local_addr().context("Failed to read local addr")?;

        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("mock KMS stopped: {e}");
            }
        });

        Ok(Self {
            state,
            addr,
            server,
        })
    }

    /// Base URL of the mock.
    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Replaces the health report.
    pub fn set_health(&self, initialized: bool, sealed: bool, version: &str) {
        let mut state = lock(&self.state);
        state.initialized = initialized;
        state.sealed = sealed;
        state.version = version.into();
    }

    /// Makes every request fail with `code`, or clears the failure.
    pub fn fail_with(&self, code: Option<u16>) {
        lock(&self.state).failure = code;
    }

    /// Sign and verify bodies received so far, with their paths.
    pub fn writes(&self) -> Vec<(String, Value)> {
        lock(&self.state).writes.clone()
    }

    /// Transit client pointed at the mock, without a token.
    pub fn client(&self) -> TransitClient {
        TransitClient::new(Arc::new(transport(&self.address())))
    }

    /// Key store over [`Self::client`].
    pub fn store(&self) -> VaultKeyStore {
        VaultKeyStore::new(Arc::new(self.client()))
    }
}

impl Drop for MockKms {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// HTTP transport with a short timeout.
pub fn transport(address: &str) -> HttpTransport {
    let config = HttpTransportConfig::new(address).with_timeout(Duration::from_secs(5));
    HttpTransport::new(&config).expect("Failed to create HTTP transport")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest as _, Sha256};
    use vaultsign_crypto::codec;
    use vaultsign_keystore::KeyStoreError;
    use vaultsign_signature::{SignatureError, SigningEngine};
    use vaultsign_testkit::fixtures::{
        CREATION_TIME, ECDSA_P256_CERTIFICATE, RSA_2048_CERTIFICATE, ROOT_CA_CERTIFICATE,
    };
    use vaultsign_transit::{Client, TransitError};

    async fn kms() -> MockKms {
        MockKms::start(vec![KeyFixture::ecdsa_p256(), KeyFixture::rsa_2048()])
            .await
            .unwrap()
    }

    async fn loaded_store(kms: &MockKms) -> VaultKeyStore {
        let store = kms.store();
        store.load(Some(ROOT_TOKEN)).await.unwrap();
        store
    }

    // ========================================================================
    // Key Store Loading
    // ========================================================================

    #[tokio::test]
    async fn test_load_and_list_aliases() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;

        let aliases = store.aliases().await.unwrap();
        assert_eq!(aliases, vec!["my-ecdsa-p256", "my-rsa-2048"]);

        assert!(store.contains_alias("my-rsa-2048").await);
        assert!(store.is_key_entry("my-ecdsa-p256").await);
        assert!(!store.contains_alias("missing").await);
    }

    #[tokio::test]
    async fn test_load_rejects_sealed_kms() {
        let kms = kms().await;
        kms.set_health(true, true, "1.15.2");

        let err = kms.store().load(Some(ROOT_TOKEN)).await.unwrap_err();
        assert!(matches!(err, KeyStoreError::Sealed));
    }

    #[tokio::test]
    async fn test_load_rejects_uninitialized_kms() {
        let kms = kms().await;
        kms.set_health(false, true, "1.15.2");

        let err = kms.store().load(Some(ROOT_TOKEN)).await.unwrap_err();
        assert!(matches!(err, KeyStoreError::NotInitializedVault));
    }

    #[tokio::test]
    async fn test_load_rejects_old_kms() {
        let kms = kms().await;
        kms.set_health(true, false, "1.14.10");

        let err = kms.store().load(Some(ROOT_TOKEN)).await.unwrap_err();
        match err {
            KeyStoreError::VersionTooOld { found, minimum } => {
                assert_eq!(found, "1.14.10");
                assert_eq!(minimum, "1.15");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_token_is_not_authorized() {
        let kms = kms().await;
        let store = kms.store();

        // Health is unauthenticated, so loading without a token succeeds.
        store.load(None).await.unwrap();

        let err = store.aliases().await.unwrap_err();
        assert!(matches!(
            err,
            KeyStoreError::Transit(TransitError::NotAuthorized(m)) if m == "permission denied"
        ));
    }

    #[tokio::test]
    async fn test_authenticate_replaces_bad_token() {
        let kms = kms().await;
        let client = TransitClient::with_token(Arc::new(transport(&kms.address())), "stale");

        assert!(matches!(
            client.list().await.unwrap_err(),
            TransitError::NotAuthorized(_)
        ));

        client.authenticate(ROOT_TOKEN).await.unwrap();
        assert_eq!(client.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_key_listing() {
        let kms = MockKms::start(Vec::new()).await.unwrap();
        let store = loaded_store(&kms).await;

        assert!(store.aliases().await.unwrap().is_empty());
    }

    // ========================================================================
    // Key Entries
    // ========================================================================

    #[tokio::test]
    async fn test_key_metadata_over_http() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;

        let key = store.key("my-ecdsa-p256").await.unwrap();
        assert_eq!(key.name(), "my-ecdsa-p256");
        assert_eq!(key.key_type(), "ecdsa-p256");
        assert_eq!(key.latest_version(), 1);
        assert_eq!(key.format(), "DER");
        assert!(key.supports_signing());
        assert!(!key.encoded_public_key().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;

        let err = store.key("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Key \"missing\" not found");
        assert!(store.certificate("missing").await.is_none());
        assert!(store.creation_date("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_certificate_chain_leaf_first() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;

        let chain = store.certificate_chain("my-rsa-2048").await.unwrap();
        assert_eq!(chain.len(), 2);

        let leaf = codec::decode_certificate_chain(RSA_2048_CERTIFICATE).unwrap();
        let root = codec::decode_certificate_chain(ROOT_CA_CERTIFICATE).unwrap();
        assert_eq!(chain[0], leaf[0]);
        assert_eq!(chain[1], root[0]);

        let ec_leaf = codec::decode_certificate_chain(ECDSA_P256_CERTIFICATE).unwrap();
        assert_eq!(store.certificate("my-ecdsa-p256").await, Some(ec_leaf[0].clone()));
    }

    #[tokio::test]
    async fn test_creation_date() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;

        let date = store.creation_date("my-rsa-2048").await.unwrap();
        assert_eq!(
            date,
            vaultsign_keystore::store::parse_creation_time(CREATION_TIME).unwrap()
        );
        assert_eq!(date.timestamp_subsec_nanos(), 827_284_962);
    }

    // ========================================================================
    // Signing
    // ========================================================================

    #[tokio::test]
    async fn test_ecdsa_sign_then_verify() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;
        let key = store.key("my-ecdsa-p256").await.unwrap();
        let data = b"integration payload";

        let mut engine = SigningEngine::for_algorithm("SHA256withECDSA").unwrap();
        engine.init_sign(Arc::clone(&key)).unwrap();
        engine.update(data);
        let signature = engine.sign().await.unwrap();

        let digest = BASE64.encode(Sha256::digest(data));
        assert_eq!(
            signature,
            mock_signature("my-ecdsa-p256", "sha2-256", &digest)
        );

        let writes = kms.writes();
        let (path, body) = writes.last().unwrap();
        assert_eq!(path, "transit/sign/my-ecdsa-p256");
        assert_eq!(body["prehashed"], json!(true));
        assert_eq!(body["hash_algorithm"], json!("sha2-256"));
        assert_eq!(body["input"], json!(digest));
        assert!(body.get("signature_algorithm").is_none());
        assert!(body.get("salt_length").is_none());

        engine.init_verify(Arc::clone(&key)).unwrap();
        engine.update(data);
        assert!(engine.verify(&signature).await.unwrap());

        engine.init_verify(key).unwrap();
        engine.update(b"tampered payload");
        assert!(!engine.verify(&signature).await.unwrap());
    }

    #[tokio::test]
    async fn test_rsa_pss_request_body() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;
        let key = store.key("my-rsa-2048").await.unwrap();

        let mut engine = SigningEngine::for_algorithm("SHA384withRSA/PSS").unwrap();
        engine.init_sign(key).unwrap();
        engine.update(b"abc");
        engine.sign().await.unwrap();

        let writes = kms.writes();
        let (_, body) = writes.last().unwrap();
        assert_eq!(body["hash_algorithm"], json!("sha2-384"));
        assert_eq!(body["signature_algorithm"], json!("pss"));
        assert_eq!(body["salt_length"], json!("auto"));
    }

    #[tokio::test]
    async fn test_verify_sends_envelope() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;
        let key = store.key("my-rsa-2048").await.unwrap();

        let mut engine = SigningEngine::for_algorithm("SHA256withRSA").unwrap();
        engine.init_verify(key).unwrap();
        engine.update(b"abc");
        assert!(!engine.verify(b"not-a-signature").await.unwrap());

        let writes = kms.writes();
        let (path, body) = writes.last().unwrap();
        assert_eq!(path, "transit/verify/my-rsa-2048");
        assert_eq!(
            body["signature"],
            json!(format!("vault:v1:{}", BASE64.encode(b"not-a-signature")))
        );
        assert_eq!(body["signature_algorithm"], json!("pkcs1v15"));
    }

    #[tokio::test]
    async fn test_family_mismatch_is_local() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;
        let key = store.key("my-rsa-2048").await.unwrap();

        let mut engine = SigningEngine::for_algorithm("SHA256withECDSA").unwrap();
        let err = engine.init_sign(key).unwrap_err();
        assert!(matches!(err, SignatureError::AlgorithmMismatch(_)));
        assert!(kms.writes().is_empty());
    }

    // ========================================================================
    // Remote Failures
    // ========================================================================

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;
        let key = store.key("my-ecdsa-p256").await.unwrap();

        kms.fail_with(Some(500));

        let mut engine = SigningEngine::for_algorithm("SHA256withECDSA").unwrap();
        engine.init_sign(key).unwrap();
        engine.update(b"abc");

        let err = engine.sign().await.unwrap_err();
        assert!(matches!(
            err,
            SignatureError::RemoteSigning(TransitError::RemoteUnavailable(m)) if m == "injected failure"
        ));
    }

    #[tokio::test]
    async fn test_client_error_is_rejected() {
        let kms = kms().await;
        let store = loaded_store(&kms).await;

        kms.fail_with(Some(400));

        let err = store.aliases().await.unwrap_err();
        assert!(matches!(
            err,
            KeyStoreError::Transit(TransitError::Rejected { code: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_kms() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = TransitClient::new(Arc::new(transport(&format!("http://{addr}"))));
        let store = VaultKeyStore::new(Arc::new(client));

        let err = store.load(Some(ROOT_TOKEN)).await.unwrap_err();
        assert!(matches!(
            err,
            KeyStoreError::Transit(TransitError::RemoteUnavailable(_))
        ));
    }
}
