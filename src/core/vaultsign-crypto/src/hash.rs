//! Hash algorithm names.
//!
//! Callers name digests the standard way (`SHA-256`, `SHA3-384`), the KMS
//! names them its own way (`sha2-256`, `sha3-384`). This module is the single
//! static mapping between the two conventions.
//!
//! Standard names are matched case-insensitively; KMS names must match
//! exactly.

use std::str::FromStr;

use crate::error::CryptoError;

/// Digest algorithms supported by the transit signing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1.
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
    /// SHA3-224.
    Sha3_224,
    /// SHA3-256.
    Sha3_256,
    /// SHA3-384.
    Sha3_384,
    /// SHA3-512.
    Sha3_512,
}

impl HashAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [HashAlgorithm; 9] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
    ];

    /// Standard name, e.g. `SHA-256`.
    pub const fn standard_name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Sha3_224 => "SHA3-224",
            Self::Sha3_256 => "SHA3-256",
            Self::Sha3_384 => "SHA3-384",
            Self::Sha3_512 => "SHA3-512",
        }
    }

    /// KMS name, e.g. `sha2-256`.
    pub const fn remote_name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha2-224",
            Self::Sha256 => "sha2-256",
            Self::Sha384 => "sha2-384",
            Self::Sha512 => "sha2-512",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
        }
    }

    /// Digest size in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha3_256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 => 64,
        }
    }

    /// Looks up an algorithm by standard name, ignoring ASCII case.
    pub fn from_standard_name(name: &str) -> Result<Self, CryptoError> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.standard_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(name.to_string()))
    }

    /// Looks up an algorithm by its exact KMS name.
    pub fn from_remote_name(name: &str) -> Result<Self, CryptoError> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.remote_name() == name)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(name.to_string()))
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.standard_name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_standard_name(s)
    }
}

/// Translates a standard hash name into the KMS naming convention.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedAlgorithm`] for unknown names.
pub fn to_remote_name(standard_name: &str) -> Result<&'static str, CryptoError> {
    HashAlgorithm::from_standard_name(standard_name).map(HashAlgorithm::remote_name)
}

/// Translates a KMS hash name back into its standard name.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedAlgorithm`] for unknown names.
pub fn to_standard_name(remote_name: &str) -> Result<&'static str, CryptoError> {
    HashAlgorithm::from_remote_name(remote_name).map(HashAlgorithm::standard_name)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_algorithm() {
        for alg in HashAlgorithm::ALL {
            let remote = to_remote_name(alg.standard_name()).unwrap();
            assert_eq!(to_standard_name(remote).unwrap(), alg.standard_name());
        }
    }

    #[test]
    fn test_known_pairs() {
        assert_eq!(to_remote_name("SHA-1").unwrap(), "sha1");
        assert_eq!(to_remote_name("SHA-224").unwrap(), "sha2-224");
        assert_eq!(to_remote_name("SHA-512").unwrap(), "sha2-512");
        assert_eq!(to_remote_name("SHA3-256").unwrap(), "sha3-256");
        assert_eq!(to_standard_name("sha2-384").unwrap(), "SHA-384");
    }

    #[test]
    fn test_standard_name_is_case_insensitive() {
        assert_eq!(to_remote_name("sha-256").unwrap(), "sha2-256");
        assert_eq!(to_remote_name("Sha3-512").unwrap(), "sha3-512");
    }

    #[test]
    fn test_remote_name_is_exact() {
        assert!(matches!(
            to_standard_name("SHA2-256"),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            to_standard_name("sha256"),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_unknown_standard_name() {
        let result = to_remote_name("MD5");
        assert!(matches!(result, Err(CryptoError::UnsupportedAlgorithm(name)) if name == "MD5"));
    }

    #[test]
    fn test_from_str_and_display() {
        let alg: HashAlgorithm = "sha-384".parse().unwrap();
        assert_eq!(alg, HashAlgorithm::Sha384);
        assert_eq!(alg.to_string(), "SHA-384");
    }
}
