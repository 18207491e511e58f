//! Digest-then-sign engine.
//!
//! A [`SigningEngine`] hashes data locally and hands only the digest to the
//! KMS. It is reusable: after `init`, any number of update/sign (or
//! update/verify) cycles may follow, and `init` may be called again with
//! another key or purpose.

use std::sync::Arc;

use tracing::debug;

use vaultsign_crypto::{Digest, HashAlgorithm};
use vaultsign_transit::{KeyFamily, RemoteKey};

use crate::algorithms::{self, Padding, SaltLength, SignatureAlgorithm};
use crate::error::SignatureError;

/// What an engine is initialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Produce signatures.
    Sign,
    /// Check signatures.
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Uninitialized,
    Sign,
    Verify,
}

/// Signs or verifies data with a remote key.
#[derive(Debug)]
pub struct SigningEngine {
    algorithm: SignatureAlgorithm,
    digest: Digest,
    mode: Mode,
    key: Option<Arc<RemoteKey>>,
}

impl SigningEngine {
    /// Creates an engine from its parts.
    ///
    /// `hash` is the KMS hash name (`sha2-256`, `sha3-384`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::UnsupportedAlgorithm`] if `hash` is unknown
    /// or the combination is not one of [`algorithms::ALGORITHMS`].
    pub fn new(
        hash: &str,
        family: KeyFamily,
        padding: Padding,
        salt: SaltLength,
    ) -> Result<Self, SignatureError> {
        let hash = HashAlgorithm::from_remote_name(hash)?;
        let algorithm = algorithms::find(hash, family, padding).ok_or_else(|| {
            SignatureError::UnsupportedAlgorithm(format!(
                "{} with {family} and {padding:?} padding",
                hash.remote_name()
            ))
        })?;

        Ok(Self::from_descriptor(SignatureAlgorithm { salt, ..algorithm }))
    }

    /// Creates an engine for a named algorithm or alias, e.g.
    /// `SHA256withECDSA` or `1.2.840.113549.1.1.11`.
    pub fn for_algorithm(identifier: &str) -> Result<Self, SignatureError> {
        algorithms::lookup(identifier).map(Self::from_descriptor)
    }

    /// Creates an engine for a descriptor.
    pub fn from_descriptor(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            digest: Digest::new(algorithm.hash),
            mode: Mode::Uninitialized,
            key: None,
        }
    }

    /// Overrides the PSS salt policy.
    pub fn with_salt_length(mut self, salt: SaltLength) -> Self {
        self.algorithm.salt = salt;
        self
    }

    /// The scheme this engine runs.
    pub fn algorithm(&self) -> &SignatureAlgorithm {
        &self.algorithm
    }

    /// Binds a key for `purpose` and discards buffered data.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::NullKey`] if `key` is `None`
    /// - [`SignatureError::AlgorithmMismatch`] if the key family differs from
    ///   the engine's
    pub fn init(
        &mut self,
        key: Option<Arc<RemoteKey>>,
        purpose: Purpose,
    ) -> Result<(), SignatureError> {
        let key = key.ok_or(SignatureError::NullKey)?;

        if key.family() != self.algorithm.family {
            return Err(SignatureError::AlgorithmMismatch(format!(
                "Signature initialized as {} (not {})",
                self.algorithm.family,
                key.family()
            )));
        }

        debug!(
            key = %key.name(),
            algorithm = %self.algorithm,
            purpose = ?purpose,
            "Signing engine initialized"
        );

        self.key = Some(key);
        self.mode = match purpose {
            Purpose::Sign => Mode::Sign,
            Purpose::Verify => Mode::Verify,
        };
        self.digest.reset();
        Ok(())
    }

    /// Shorthand for `init(Some(key), Purpose::Sign)`.
    pub fn init_sign(&mut self, key: Arc<RemoteKey>) -> Result<(), SignatureError> {
        self.init(Some(key), Purpose::Sign)
    }

    /// Shorthand for `init(Some(key), Purpose::Verify)`.
    pub fn init_verify(&mut self, key: Arc<RemoteKey>) -> Result<(), SignatureError> {
        self.init(Some(key), Purpose::Verify)
    }

    /// Appends data.
    pub fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Appends one byte.
    pub fn update_byte(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// Appends `len` bytes of `data` starting at `offset`.
    pub fn update_range(
        &mut self,
        data: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<(), SignatureError> {
        let range = offset
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .map(|end| offset..end)
            .ok_or_else(|| {
                SignatureError::InvalidArgument(format!(
                    "range {offset}+{len} out of bounds for {} bytes",
                    data.len()
                ))
            })?;

        self.digest.update(&data[range]);
        Ok(())
    }

    fn bound_key(&self, expected: Mode) -> Result<Arc<RemoteKey>, SignatureError> {
        match (&self.key, self.mode == expected) {
            (Some(key), true) => Ok(Arc::clone(key)),
            _ => Err(SignatureError::NotInitialized),
        }
    }

    /// Signs everything appended since the last init or sign.
    pub async fn sign(&mut self) -> Result<Vec<u8>, SignatureError> {
        let key = self.bound_key(Mode::Sign)?;
        let digest = self.digest.finalize_reset();

        let signature = key
            .sign(
                &digest,
                self.algorithm.hash.remote_name(),
                self.algorithm.padding.remote_name(),
                &self.algorithm.remote_salt_length(),
            )
            .await?;

        Ok(signature)
    }

    /// Checks `signature` against everything appended since the last init or
    /// verify.
    ///
    /// A `false` verdict and a failed call are distinct: remote errors are
    /// returned as errors, never as `false`.
    pub async fn verify(&mut self, signature: &[u8]) -> Result<bool, SignatureError> {
        let key = self.bound_key(Mode::Verify)?;
        let digest = self.digest.finalize_reset();

        let valid = key
            .verify(
                &digest,
                self.algorithm.hash.remote_name(),
                self.algorithm.padding.remote_name(),
                signature,
            )
            .await?;

        Ok(valid)
    }
}
