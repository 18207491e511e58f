//! Transit wire format.
//!
//! ## Request bodies
//!
//! Sign and verify share one body layout. Fields are emitted in this order:
//! `prehashed`, `hash_algorithm`, `input`, `signature`,
//! `signature_algorithm`, `salt_length`. `prehashed` is always present.
//! String fields are omitted when empty; `input` is omitted only when no
//! input was supplied at all.
//!
//! ## Signature envelope
//!
//! Signatures travel as `vault:v{version}:{base64}`. Verify requests always
//! send the `vault:v1:` prefix; the KMS picks the key version itself.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransitError;

/// Prefix of the signature envelope.
pub const ENVELOPE_PREFIX: &str = "vault";

/// Prefix put in front of signatures sent for verification.
pub const VERIFY_SIGNATURE_PREFIX: &str = "vault:v1:";

/// JSON body of a sign or verify request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestBody {
    /// Whether `input` is already a digest.
    pub prehashed: bool,
    /// KMS hash algorithm name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<String>,
    /// Base64 of the input bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Signature envelope (verify only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// RSA padding scheme (`pkcs1v15`, `pss`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<String>,
    /// PSS salt length policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt_length: Option<String>,
}

impl RequestBody {
    /// Converts the body into a JSON value, keeping field order.
    pub fn to_value(&self) -> Result<Value, TransitError> {
        serde_json::to_value(self).map_err(|e| TransitError::Protocol(e.to_string()))
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Builder applying the field omission rules.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    body: RequestBody,
}

impl RequestBuilder {
    /// Starts an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the input; it is base64-encoded.
    pub fn input(mut self, input: &[u8]) -> Self {
        self.body.input = Some(BASE64.encode(input));
        self
    }

    /// Sets the signature; it is wrapped in the `vault:v1:` envelope.
    pub fn signature(mut self, signature: &[u8]) -> Self {
        self.body.signature = Some(format!(
            "{}{}",
            VERIFY_SIGNATURE_PREFIX,
            BASE64.encode(signature)
        ));
        self
    }

    /// Sets the KMS hash algorithm name.
    pub fn hash_algorithm(mut self, hash_algorithm: &str) -> Self {
        self.body.hash_algorithm = non_empty(hash_algorithm);
        self
    }

    /// Sets the prehashed flag.
    pub fn prehashed(mut self, prehashed: bool) -> Self {
        self.body.prehashed = prehashed;
        self
    }

    /// Sets the RSA padding scheme.
    pub fn signature_algorithm(mut self, signature_algorithm: &str) -> Self {
        self.body.signature_algorithm = non_empty(signature_algorithm);
        self
    }

    /// Sets the PSS salt length policy.
    pub fn salt_length(mut self, salt_length: &str) -> Self {
        self.body.salt_length = non_empty(salt_length);
        self
    }

    /// Finishes the body.
    pub fn build(self) -> RequestBody {
        self.body
    }
}

/// Parameters of a sign call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    /// Name of the transit key.
    pub key_name: String,
    /// Raw input, or its digest when `prehashed` is set.
    pub input: Vec<u8>,
    /// KMS hash algorithm name.
    pub hash_algorithm: String,
    /// RSA padding scheme; empty for ECDSA.
    pub signature_algorithm: String,
    /// Whether `input` is already a digest.
    pub prehashed: bool,
    /// PSS salt length policy; empty when not applicable.
    pub salt_length: String,
}

impl SignRequest {
    /// Builds the JSON body for `transit/sign`.
    pub fn to_body(&self) -> RequestBody {
        RequestBuilder::new()
            .input(&self.input)
            .hash_algorithm(&self.hash_algorithm)
            .signature_algorithm(&self.signature_algorithm)
            .prehashed(self.prehashed)
            .salt_length(&self.salt_length)
            .build()
    }
}

/// Parameters of a verify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    /// Name of the transit key.
    pub key_name: String,
    /// Raw input, or its digest when `prehashed` is set.
    pub input: Vec<u8>,
    /// KMS hash algorithm name.
    pub hash_algorithm: String,
    /// RSA padding scheme; empty for ECDSA.
    pub signature_algorithm: String,
    /// Whether `input` is already a digest.
    pub prehashed: bool,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

impl VerifyRequest {
    /// Builds the JSON body for `transit/verify`.
    pub fn to_body(&self) -> RequestBody {
        RequestBuilder::new()
            .input(&self.input)
            .signature(&self.signature)
            .hash_algorithm(&self.hash_algorithm)
            .prehashed(self.prehashed)
            .signature_algorithm(&self.signature_algorithm)
            .build()
    }
}

/// A decoded signature envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnvelope {
    /// Key version that produced the signature.
    pub key_version: u32,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

/// Parses a signature envelope.
///
/// Accepts `vault:v{version}:{base64}` and the version-prefixed
/// `vault:v1:{version}:{base64}`. The payload is always the last field.
pub fn parse_signature_envelope(envelope: &str) -> Result<SignatureEnvelope, TransitError> {
    let malformed = || TransitError::Protocol(format!("malformed signature: {envelope}"));

    let parts: Vec<&str> = envelope.split(':').collect();
    if parts[0] != ENVELOPE_PREFIX {
        return Err(malformed());
    }

    let envelope_version: u32 = parts
        .get(1)
        .and_then(|p| p.strip_prefix('v'))
        .and_then(|v| v.parse().ok())
        .ok_or_else(malformed)?;

    let (key_version, payload) = match parts.len() {
        3 => (envelope_version, parts[2]),
        4 => (parts[2].parse().map_err(|_| malformed())?, parts[3]),
        _ => return Err(malformed()),
    };

    let signature = BASE64.decode(payload).map_err(|_| malformed())?;

    Ok(SignatureEnvelope {
        key_version,
        signature,
    })
}

/// Extracts the raw signature from a sign response payload.
pub fn parse_sign_response(data: &Value) -> Result<SignatureEnvelope, TransitError> {
    let envelope = data
        .get("signature")
        .and_then(Value::as_str)
        .ok_or_else(|| TransitError::Protocol("sign response has no signature".into()))?;

    parse_signature_envelope(envelope)
}

/// Extracts the verdict from a verify response payload.
pub fn parse_verify_response(data: &Value) -> Result<bool, TransitError> {
    data.get("valid")
        .and_then(Value::as_bool)
        .ok_or_else(|| TransitError::Protocol("verify response has no boolean 'valid'".into()))
}

/// Health report of the KMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStatus {
    /// Whether the KMS has been initialized.
    pub initialized: bool,
    /// Whether the KMS is sealed.
    pub sealed: bool,
    /// Server version string, e.g. `1.15.2`.
    pub version: String,
}

/// Decodes a health payload.
pub fn parse_status(data: &Value) -> Result<VaultStatus, TransitError> {
    VaultStatus::deserialize(data)
        .map_err(|e| TransitError::Protocol(format!("malformed health response: {e}")))
}
