//! Key material and metadata builders.
//!
//! The PEM files under `fixtures/` were generated with OpenSSL: one RSA-2048
//! and one P-256 key pair, each with a leaf certificate issued by a common
//! test root.

use serde_json::{json, Value};

/// RSA-2048 SubjectPublicKeyInfo.
pub const RSA_2048_PUBLIC_KEY: &str = include_str!("../fixtures/rsa-2048.pub.pem");

/// P-256 SubjectPublicKeyInfo.
pub const ECDSA_P256_PUBLIC_KEY: &str = include_str!("../fixtures/ecdsa-p256.pub.pem");

/// Leaf certificate for the RSA-2048 key.
pub const RSA_2048_CERTIFICATE: &str = include_str!("../fixtures/rsa-2048.crt.pem");

/// Leaf certificate for the P-256 key.
pub const ECDSA_P256_CERTIFICATE: &str = include_str!("../fixtures/ecdsa-p256.crt.pem");

/// Self-signed root that issued both leaf certificates.
pub const ROOT_CA_CERTIFICATE: &str = include_str!("../fixtures/root-ca.crt.pem");

/// Creation time used by every fixture version, in the KMS's nanosecond form.
pub const CREATION_TIME: &str = "2024-09-10T10:41:48.827284962Z";

/// Builder for a transit key-read payload.
#[derive(Debug, Clone)]
pub struct KeyFixture {
    /// Key name.
    pub name: String,
    /// KMS key type.
    pub key_type: String,
    /// Per-version `name` field.
    pub version_name: String,
    /// Number of versions; the last one is the latest.
    pub versions: u32,
    /// Overrides `latest_version`; defaults to `versions`.
    pub latest_version: Option<u32>,
    /// PEM public key of every version.
    pub public_key: String,
    /// PEM chain of every version.
    pub certificate_chain: String,
    /// Creation time of every version.
    pub creation_time: String,
    /// `supports_signing` flag.
    pub supports_signing: bool,
}

impl KeyFixture {
    /// `my-rsa-2048`, one version, chain leaf then root.
    pub fn rsa_2048() -> Self {
        Self {
            name: "my-rsa-2048".into(),
            key_type: "rsa-2048".into(),
            version_name: "rsa-2048".into(),
            versions: 1,
            latest_version: None,
            public_key: RSA_2048_PUBLIC_KEY.into(),
            certificate_chain: format!("{RSA_2048_CERTIFICATE}{ROOT_CA_CERTIFICATE}"),
            creation_time: CREATION_TIME.into(),
            supports_signing: true,
        }
    }

    /// `my-ecdsa-p256`, one version, chain leaf then root.
    pub fn ecdsa_p256() -> Self {
        Self {
            name: "my-ecdsa-p256".into(),
            key_type: "ecdsa-p256".into(),
            version_name: "P-256".into(),
            versions: 1,
            latest_version: None,
            public_key: ECDSA_P256_PUBLIC_KEY.into(),
            certificate_chain: format!("{ECDSA_P256_CERTIFICATE}{ROOT_CA_CERTIFICATE}"),
            creation_time: CREATION_TIME.into(),
            supports_signing: true,
        }
    }

    /// Renames the key.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the key type.
    pub fn key_type(mut self, key_type: &str) -> Self {
        self.key_type = key_type.into();
        self
    }

    /// Sets the number of versions.
    pub fn versions(mut self, versions: u32) -> Self {
        self.versions = versions;
        self
    }

    /// Reports a latest version that may not exist.
    pub fn latest_version(mut self, latest_version: u32) -> Self {
        self.latest_version = Some(latest_version);
        self
    }

    /// Overrides the public key.
    pub fn public_key(mut self, public_key: &str) -> Self {
        self.public_key = public_key.into();
        self
    }

    /// Overrides the chain; an empty string means no chain.
    pub fn certificate_chain(mut self, certificate_chain: &str) -> Self {
        self.certificate_chain = certificate_chain.into();
        self
    }

    /// Overrides the creation time.
    pub fn creation_time(mut self, creation_time: &str) -> Self {
        self.creation_time = creation_time.into();
        self
    }

    /// Sets `supports_signing`.
    pub fn supports_signing(mut self, supports_signing: bool) -> Self {
        self.supports_signing = supports_signing;
        self
    }

    /// Renders the payload a transit key read returns.
    pub fn to_metadata(&self) -> Value {
        let mut keys = serde_json::Map::new();
        for index in 1..=self.versions {
            keys.insert(
                index.to_string(),
                json!({
                    "certificate_chain": self.certificate_chain,
                    "creation_time": self.creation_time,
                    "name": self.version_name,
                    "public_key": self.public_key,
                }),
            );
        }

        let is_rsa = self.key_type.starts_with("rsa");

        json!({
            "allow_plaintext_backup": false,
            "auto_rotate_period": 0,
            "deletion_allowed": false,
            "derived": false,
            "exportable": false,
            "imported_key": false,
            "keys": keys,
            "latest_version": self.latest_version.unwrap_or(self.versions),
            "min_available_version": 0,
            "min_decryption_version": 1,
            "min_encryption_version": 0,
            "name": self.name,
            "supports_decryption": is_rsa,
            "supports_derivation": false,
            "supports_encryption": is_rsa,
            "supports_signing": self.supports_signing,
            "type": self.key_type,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shapes() {
        let metadata = KeyFixture::ecdsa_p256().versions(2).to_metadata();

        assert_eq!(metadata["type"], "ecdsa-p256");
        assert_eq!(metadata["latest_version"], 2);
        assert_eq!(metadata["keys"]["2"]["name"], "P-256");
        assert!(metadata["keys"]["1"]["public_key"]
            .as_str()
            .unwrap()
            .starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_chain_has_two_certificates() {
        let chain = KeyFixture::rsa_2048().certificate_chain;
        assert_eq!(chain.matches("-----BEGIN CERTIFICATE-----").count(), 2);
    }
}
