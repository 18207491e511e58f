//! Remote key model.
//!
//! A [`RemoteKey`] is an immutable snapshot of one transit key's metadata as
//! returned by a key read. It owns every [`KeyVersion`], caches the DER
//! public key of the latest version, and signs or verifies through the
//! client it was read with.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use vaultsign_crypto::codec;

use crate::client::Client;
use crate::error::TransitError;
use crate::wire::{SignRequest, VerifyRequest};

/// Encoding of [`RemoteKey::encoded_public_key`].
pub const PUBLIC_KEY_FORMAT: &str = "DER";

// ============================================================================
// Types
// ============================================================================

/// Cryptographic family of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// RSA keys (`rsa-2048`, `rsa-3072`, `rsa-4096`).
    Rsa,
    /// Elliptic-curve keys (`ecdsa-p256`, `ecdsa-p384`, `ecdsa-p521`).
    Ec,
}

impl KeyFamily {
    /// Derives the family from a KMS key type, ignoring ASCII case.
    pub fn from_key_type(key_type: &str) -> Option<Self> {
        let lower = key_type.to_ascii_lowercase();
        if lower.starts_with("rsa") {
            Some(Self::Rsa)
        } else if lower.starts_with("ec") {
            Some(Self::Ec)
        } else {
            None
        }
    }
}

impl std::fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa => write!(f, "RSA"),
            Self::Ec => write!(f, "EC"),
        }
    }
}

/// Raw key-read record.
///
/// Every field defaults when absent so that validation can report what is
/// actually wrong instead of a generic decoding error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyMetadata {
    /// Key name.
    pub name: String,
    /// KMS key type, e.g. `rsa-2048`.
    #[serde(rename = "type")]
    pub key_type: String,
    /// Newest version.
    pub latest_version: u32,
    /// Oldest version allowed for encryption.
    pub min_encryption_version: u32,
    /// Oldest version allowed for decryption.
    pub min_decryption_version: u32,
    /// Oldest version still stored.
    pub min_available_version: u32,
    /// Rotation period in seconds (number or string).
    pub auto_rotate_period: Value,
    /// Whether a plaintext backup may be taken.
    pub allow_plaintext_backup: bool,
    /// Whether the key may be deleted.
    pub deletion_allowed: bool,
    /// Whether the key is derived.
    pub derived: bool,
    /// Whether the key may be exported.
    pub exportable: bool,
    /// Whether the key material was imported.
    pub imported_key: bool,
    /// Whether the key can decrypt.
    pub supports_decryption: bool,
    /// Whether the key supports derivation.
    pub supports_derivation: bool,
    /// Whether the key can encrypt.
    pub supports_encryption: bool,
    /// Whether the key can sign.
    pub supports_signing: bool,
    /// Versions keyed by their decimal index.
    pub keys: BTreeMap<String, Value>,
}

impl KeyMetadata {
    /// Decodes a key-read payload.
    pub fn from_value(data: &Value) -> Result<Self, TransitError> {
        Self::deserialize(data)
            .map_err(|e| TransitError::Protocol(format!("malformed key metadata: {e}")))
    }
}

/// One generation of a key pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyVersion {
    /// Version index.
    pub index: u32,
    /// Creation time as reported by the KMS.
    pub creation_time: Option<String>,
    /// Version name, when the KMS reports one.
    pub name: Option<String>,
    /// PEM public key.
    pub public_key: Option<String>,
    /// PEM certificate chain, leaf first.
    pub certificate_chain: Option<String>,
}

impl KeyVersion {
    fn from_value(index: u32, value: &Value) -> Option<Self> {
        let entry = value.as_object()?;
        let text = |field: &str| {
            entry
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            index,
            creation_time: text("creation_time"),
            name: text("name"),
            public_key: text("public_key"),
            certificate_chain: text("certificate_chain").filter(|chain| !chain.is_empty()),
        })
    }
}

/// What the KMS allows on a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Sign and verify.
    pub supports_signing: bool,
    /// Encrypt.
    pub supports_encryption: bool,
    /// Decrypt.
    pub supports_decryption: bool,
    /// Key derivation.
    pub supports_derivation: bool,
    /// Derived key.
    pub derived: bool,
    /// Export.
    pub exportable: bool,
    /// Deletion.
    pub deletion_allowed: bool,
    /// Plaintext backup.
    pub allow_plaintext_backup: bool,
    /// Imported key material.
    pub imported_key: bool,
}

// ============================================================================
// Remote Key
// ============================================================================

/// Immutable view of a transit signing key.
pub struct RemoteKey {
    name: String,
    key_type: String,
    family: KeyFamily,
    latest_version: u32,
    min_encryption_version: u32,
    min_decryption_version: u32,
    min_available_version: u32,
    auto_rotate_period: Option<u64>,
    capabilities: Capabilities,
    versions: BTreeMap<u32, KeyVersion>,
    public_key_der: Vec<u8>,
    client: Arc<dyn Client>,
}

impl RemoteKey {
    /// Builds a key from its metadata, bound to `client`.
    ///
    /// # Errors
    ///
    /// - [`TransitError::UnsupportedKeyType`] if the type is neither RSA nor EC
    /// - [`TransitError::KeyMaterial`] if the latest version or its public
    ///   key is missing or does not decode
    pub fn from_metadata(meta: KeyMetadata, client: Arc<dyn Client>) -> Result<Self, TransitError> {
        let family = KeyFamily::from_key_type(&meta.key_type)
            .ok_or_else(|| TransitError::UnsupportedKeyType(meta.key_type.clone()))?;

        let mut versions = BTreeMap::new();
        for (raw_index, value) in &meta.keys {
            let Ok(index) = raw_index.parse::<u32>() else {
                warn!(key = %meta.name, entry = %raw_index, "Skipping key version with non-numeric index");
                continue;
            };
            match KeyVersion::from_value(index, value) {
                Some(version) => {
                    versions.insert(index, version);
                }
                None => {
                    warn!(key = %meta.name, version = index, "Skipping malformed key version");
                }
            }
        }

        let latest = versions.get(&meta.latest_version).ok_or_else(|| {
            TransitError::KeyMaterial(format!(
                "latest version {} of key '{}' is missing",
                meta.latest_version, meta.name
            ))
        })?;

        let pem = latest.public_key.as_deref().ok_or_else(|| {
            TransitError::KeyMaterial(format!(
                "version {} of key '{}' has no public key",
                meta.latest_version, meta.name
            ))
        })?;

        let public_key_der =
            codec::decode_public_key(pem).map_err(|e| TransitError::KeyMaterial(e.to_string()))?;

        let auto_rotate_period = match &meta.auto_rotate_period {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim_end_matches('s').parse().ok(),
            _ => None,
        };

        debug!(
            key = %meta.name,
            key_type = %meta.key_type,
            latest_version = meta.latest_version,
            versions = versions.len(),
            "Built remote key"
        );

        Ok(Self {
            name: meta.name,
            key_type: meta.key_type,
            family,
            latest_version: meta.latest_version,
            min_encryption_version: meta.min_encryption_version,
            min_decryption_version: meta.min_decryption_version,
            min_available_version: meta.min_available_version,
            auto_rotate_period,
            capabilities: Capabilities {
                supports_signing: meta.supports_signing,
                supports_encryption: meta.supports_encryption,
                supports_decryption: meta.supports_decryption,
                supports_derivation: meta.supports_derivation,
                derived: meta.derived,
                exportable: meta.exportable,
                deletion_allowed: meta.deletion_allowed,
                allow_plaintext_backup: meta.allow_plaintext_backup,
                imported_key: meta.imported_key,
            },
            versions,
            public_key_der,
            client,
        })
    }

    /// Key name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// KMS key type, e.g. `ecdsa-p256`.
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// Cryptographic family.
    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Returns a version by index.
    pub fn version(&self, index: u32) -> Option<&KeyVersion> {
        self.versions.get(&index)
    }

    /// All versions, ordered by index.
    pub fn versions(&self) -> impl Iterator<Item = &KeyVersion> {
        self.versions.values()
    }

    /// Newest version index.
    pub fn latest_version(&self) -> u32 {
        self.latest_version
    }

    /// Newest version.
    pub fn latest(&self) -> &KeyVersion {
        // Presence is checked in `from_metadata`.
        &self.versions[&self.latest_version]
    }

    /// DER SubjectPublicKeyInfo of the latest version.
    pub fn encoded_public_key(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Always `DER`.
    pub fn format(&self) -> &'static str {
        PUBLIC_KEY_FORMAT
    }

    /// Oldest version allowed for encryption.
    pub fn min_encryption_version(&self) -> u32 {
        self.min_encryption_version
    }

    /// Oldest version allowed for decryption.
    pub fn min_decryption_version(&self) -> u32 {
        self.min_decryption_version
    }

    /// Oldest version still stored.
    pub fn min_available_version(&self) -> u32 {
        self.min_available_version
    }

    /// Rotation period in seconds; `None` when unknown.
    pub fn auto_rotate_period(&self) -> Option<u64> {
        self.auto_rotate_period
    }

    /// Capability flags.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether the key can sign and verify.
    pub fn supports_signing(&self) -> bool {
        self.capabilities.supports_signing
    }

    /// Whether the key can encrypt.
    pub fn supports_encryption(&self) -> bool {
        self.capabilities.supports_encryption
    }

    /// Whether the key can decrypt.
    pub fn supports_decryption(&self) -> bool {
        self.capabilities.supports_decryption
    }

    /// Whether the key supports derivation.
    pub fn supports_derivation(&self) -> bool {
        self.capabilities.supports_derivation
    }

    /// Whether the key is derived.
    pub fn is_derived(&self) -> bool {
        self.capabilities.derived
    }

    /// Whether the key may be exported.
    pub fn is_exportable(&self) -> bool {
        self.capabilities.exportable
    }

    /// Whether the key may be deleted.
    pub fn is_deletion_allowed(&self) -> bool {
        self.capabilities.deletion_allowed
    }

    /// Whether a plaintext backup may be taken.
    pub fn allows_plaintext_backup(&self) -> bool {
        self.capabilities.allow_plaintext_backup
    }

    /// Whether the key material was imported.
    pub fn is_imported(&self) -> bool {
        self.capabilities.imported_key
    }

    fn ensure_signing(&self) -> Result<(), TransitError> {
        if self.capabilities.supports_signing {
            Ok(())
        } else {
            Err(TransitError::OperationNotAllowed(format!(
                "key '{}' does not support signing",
                self.name
            )))
        }
    }

    /// Signs a digest with the latest version.
    ///
    /// `hash_algorithm` is the KMS hash name, `signature_algorithm` the RSA
    /// padding (empty for EC) and `salt_length` the PSS salt policy (empty
    /// when not applicable).
    pub async fn sign(
        &self,
        digest: &[u8],
        hash_algorithm: &str,
        signature_algorithm: &str,
        salt_length: &str,
    ) -> Result<Vec<u8>, TransitError> {
        self.ensure_signing()?;

        let request = SignRequest {
            key_name: self.name.clone(),
            input: digest.to_vec(),
            hash_algorithm: hash_algorithm.to_string(),
            signature_algorithm: signature_algorithm.to_string(),
            prehashed: true,
            salt_length: salt_length.to_string(),
        };

        self.client.sign(&request).await
    }

    /// Verifies a signature over a digest.
    pub async fn verify(
        &self,
        digest: &[u8],
        hash_algorithm: &str,
        signature_algorithm: &str,
        signature: &[u8],
    ) -> Result<bool, TransitError> {
        self.ensure_signing()?;

        let request = VerifyRequest {
            key_name: self.name.clone(),
            input: digest.to_vec(),
            hash_algorithm: hash_algorithm.to_string(),
            signature_algorithm: signature_algorithm.to_string(),
            prehashed: true,
            signature: signature.to_vec(),
        };

        self.client.verify(&request).await
    }
}

impl std::fmt::Debug for RemoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKey")
            .field("name", &self.name)
            .field("key_type", &self.key_type)
            .field("latest_version", &self.latest_version)
            .field("versions", &self.versions.len())
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
