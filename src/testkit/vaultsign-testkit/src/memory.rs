//! In-memory KMS.
//!
//! Serves key reads, listing and health from fixed data, answers sign and
//! verify with configurable payloads, and records every request so tests can
//! assert on the exact wire body and the session it carried.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

use vaultsign_transport::{Session, Transport, TransportError};

use crate::fixtures::KeyFixture;

const KEYS_PREFIX: &str = "transit/keys/";
const SIGN_PREFIX: &str = "transit/sign/";
const VERIFY_PREFIX: &str = "transit/verify/";

/// Signature returned when none is configured.
pub const DEFAULT_SIGNATURE: &[u8] = b"memory-signature";

/// Kind of transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `read`.
    Read,
    /// `write`.
    Write,
    /// `list`.
    List,
    /// `health`.
    Health,
}

/// A request seen by [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Call kind.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Body of a write.
    pub body: Option<Value>,
    /// Token of the session used.
    pub token: Option<String>,
    /// Generation of the session used.
    pub generation: u64,
}

struct State {
    keys: Vec<(String, Value)>,
    health: Value,
    sign_response: Value,
    verify_response: Value,
    failures: VecDeque<TransportError>,
    requests: Vec<RecordedRequest>,
}

/// In-memory [`Transport`]. Clones share state.
#[derive(Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates an initialized, unsealed KMS at version 1.15.0 with no keys.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                keys: Vec::new(),
                health: json!({
                    "initialized": true,
                    "sealed": false,
                    "standby": false,
                    "version": "1.15.0",
                }),
                sign_response: signature_response(DEFAULT_SIGNATURE),
                verify_response: json!({ "valid": true }),
                failures: VecDeque::new(),
                requests: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a key built from a fixture.
    pub fn with_key(self, fixture: KeyFixture) -> Self {
        let metadata = fixture.to_metadata();
        self.with_metadata(&fixture.name, metadata)
    }

    /// Adds a key with a raw metadata payload.
    pub fn with_metadata(self, name: &str, metadata: Value) -> Self {
        self.state().keys.push((name.to_string(), metadata));
        self
    }

    /// Makes sign return `signature`.
    pub fn with_signature(self, signature: &[u8]) -> Self {
        self.set_sign_response(signature_response(signature));
        self
    }

    /// Makes verify return `valid`.
    pub fn with_verify_result(self, valid: bool) -> Self {
        self.set_verify_response(json!({ "valid": valid }));
        self
    }

    /// Replaces the health payload.
    pub fn with_health(self, health: Value) -> Self {
        self.set_health(health);
        self
    }

    /// Replaces the sign payload.
    pub fn set_sign_response(&self, response: Value) {
        self.state().sign_response = response;
    }

    /// Replaces the verify payload.
    pub fn set_verify_response(&self, response: Value) {
        self.state().verify_response = response;
    }

    /// Replaces the health payload.
    pub fn set_health(&self, health: Value) {
        self.state().health = health;
    }

    /// Fails the next call with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, error: TransportError) {
        self.state().failures.push_back(error);
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state().requests.last().cloned()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }

    fn record(
        &self,
        method: Method,
        session: &Session,
        path: &str,
        body: Option<&Value>,
    ) -> Result<MutexGuard<'_, State>, TransportError> {
        let mut state = self.state();
        state.requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
            token: session.token().map(|t| t.expose().to_string()),
            generation: session.generation(),
        });

        let failure = state.failures.pop_front();
        match failure {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

fn signature_response(signature: &[u8]) -> Value {
    json!({
        "key_version": 1,
        "signature": format!("vault:v1:1:{}", BASE64.encode(signature)),
    })
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read(&self, session: &Session, path: &str) -> Result<Option<Value>, TransportError> {
        let state = self.record(Method::Read, session, path, None)?;

        let Some(name) = path.strip_prefix(KEYS_PREFIX) else {
            return Ok(None);
        };

        Ok(state
            .keys
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, metadata)| metadata.clone()))
    }

    async fn write(
        &self,
        session: &Session,
        path: &str,
        body: &Value,
    ) -> Result<Option<Value>, TransportError> {
        let state = self.record(Method::Write, session, path, Some(body))?;

        if path.starts_with(SIGN_PREFIX) {
            Ok(Some(state.sign_response.clone()))
        } else if path.starts_with(VERIFY_PREFIX) {
            Ok(Some(state.verify_response.clone()))
        } else {
            Err(TransportError::Status {
                code: 405,
                message: format!("unsupported path: {path}"),
            })
        }
    }

    async fn list(&self, session: &Session, path: &str) -> Result<Vec<String>, TransportError> {
        let state = self.record(Method::List, session, path, None)?;

        if path.trim_end_matches('/') != "transit/keys" {
            return Ok(Vec::new());
        }

        Ok(state.keys.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn health(&self, session: &Session) -> Result<Value, TransportError> {
        let state = self.record(Method::Health, session, "sys/health", None)?;
        Ok(state.health.clone())
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryTransport")
            .field("keys", &state.keys.len())
            .field("requests", &state.requests.len())
            .finish_non_exhaustive()
    }
}
