//! Incremental message digests.
//!
//! A [`Digest`] accumulates input across any number of `update` calls and
//! produces one hash per [`Digest::finalize_reset`], after which it is empty
//! again and ready for the next message.

use sha2::digest::DynDigest;

use crate::hash::HashAlgorithm;

/// Digest accumulator for one [`HashAlgorithm`].
pub struct Digest {
    algorithm: HashAlgorithm,
    state: Box<dyn DynDigest + Send + Sync>,
}

impl Digest {
    /// Creates an empty accumulator.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state: Box<dyn DynDigest + Send + Sync> = match algorithm {
            HashAlgorithm::Sha1 => Box::new(sha1::Sha1::default()),
            HashAlgorithm::Sha224 => Box::new(sha2::Sha224::default()),
            HashAlgorithm::Sha256 => Box::new(sha2::Sha256::default()),
            HashAlgorithm::Sha384 => Box::new(sha2::Sha384::default()),
            HashAlgorithm::Sha512 => Box::new(sha2::Sha512::default()),
            HashAlgorithm::Sha3_224 => Box::new(sha3::Sha3_224::default()),
            HashAlgorithm::Sha3_256 => Box::new(sha3::Sha3_256::default()),
            HashAlgorithm::Sha3_384 => Box::new(sha3::Sha3_384::default()),
            HashAlgorithm::Sha3_512 => Box::new(sha3::Sha3_512::default()),
        };

        Self { algorithm, state }
    }

    /// Returns the algorithm this accumulator computes.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Appends data.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Returns the digest of everything accumulated so far and resets.
    pub fn finalize_reset(&mut self) -> Vec<u8> {
        self.state.finalize_reset().into_vec()
    }

    /// Discards accumulated input.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// One-shot digest of `data`.
    pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        let mut digest = Self::new(algorithm);
        digest.update(data);
        digest.finalize_reset()
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digest")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
