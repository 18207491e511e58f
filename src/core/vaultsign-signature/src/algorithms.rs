//! Signature algorithm table.
//!
//! Every supported scheme is one [`SignatureAlgorithm`] descriptor: a hash,
//! a key family, an RSA padding and a PSS salt policy. Canonical names follow
//! the `SHA256withRSA` convention; aliases cover the `...withRSAEncryption`,
//! `SHA256/RSA`, `...andMGF1` spellings and the registered OIDs.

use vaultsign_crypto::HashAlgorithm;
use vaultsign_transit::KeyFamily;

use crate::error::SignatureError;

/// RSA padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// PKCS#1 v1.5.
    Pkcs1v15,
    /// RSASSA-PSS with MGF1.
    Pss,
    /// Not applicable (ECDSA).
    None,
}

impl Padding {
    /// KMS `signature_algorithm` value; empty for ECDSA.
    pub const fn remote_name(self) -> &'static str {
        match self {
            Self::Pkcs1v15 => "pkcs1v15",
            Self::Pss => "pss",
            Self::None => "",
        }
    }
}

/// PSS salt length policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaltLength {
    /// Let the KMS pick the maximum salt.
    #[default]
    Auto,
    /// Salt as long as the digest.
    Hash,
    /// Explicit byte count.
    Bytes(u32),
}

impl SaltLength {
    /// KMS `salt_length` value.
    pub fn remote_value(self) -> String {
        match self {
            Self::Auto => "auto".to_string(),
            Self::Hash => "hash".to_string(),
            Self::Bytes(n) => n.to_string(),
        }
    }
}

impl std::str::FromStr for SaltLength {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "hash" => Ok(Self::Hash),
            other => other
                .parse()
                .map(Self::Bytes)
                .map_err(|_| SignatureError::InvalidArgument(format!("invalid salt length: {other}"))),
        }
    }
}

/// A signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureAlgorithm {
    /// Digest computed locally.
    pub hash: HashAlgorithm,
    /// Key family the scheme requires.
    pub family: KeyFamily,
    /// RSA padding.
    pub padding: Padding,
    /// PSS salt policy; ignored for other paddings.
    pub salt: SaltLength,
}

impl SignatureAlgorithm {
    const fn rsa(hash: HashAlgorithm) -> Self {
        Self {
            hash,
            family: KeyFamily::Rsa,
            padding: Padding::Pkcs1v15,
            salt: SaltLength::Auto,
        }
    }

    const fn rsa_pss(hash: HashAlgorithm) -> Self {
        Self {
            hash,
            family: KeyFamily::Rsa,
            padding: Padding::Pss,
            salt: SaltLength::Auto,
        }
    }

    const fn ecdsa(hash: HashAlgorithm) -> Self {
        Self {
            hash,
            family: KeyFamily::Ec,
            padding: Padding::None,
            salt: SaltLength::Auto,
        }
    }

    /// Canonical name, e.g. `SHA256withRSA/PSS` or `SHA3-256withECDSA`.
    pub fn name(&self) -> String {
        let hash = match self.hash {
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha224 => "SHA224",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
            other => other.standard_name(),
        };

        match (self.family, self.padding) {
            (KeyFamily::Ec, _) => format!("{hash}withECDSA"),
            (KeyFamily::Rsa, Padding::Pss) => format!("{hash}withRSA/PSS"),
            (KeyFamily::Rsa, _) => format!("{hash}withRSA"),
        }
    }

    /// Salt value to send, empty unless the padding is PSS.
    pub fn remote_salt_length(&self) -> String {
        match self.padding {
            Padding::Pss => self.salt.remote_value(),
            _ => String::new(),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// Every supported scheme.
pub const ALGORITHMS: [SignatureAlgorithm; 19] = [
    SignatureAlgorithm::rsa(HashAlgorithm::Sha1),
    SignatureAlgorithm::rsa(HashAlgorithm::Sha224),
    SignatureAlgorithm::rsa(HashAlgorithm::Sha256),
    SignatureAlgorithm::rsa(HashAlgorithm::Sha384),
    SignatureAlgorithm::rsa(HashAlgorithm::Sha512),
    SignatureAlgorithm::rsa_pss(HashAlgorithm::Sha1),
    SignatureAlgorithm::rsa_pss(HashAlgorithm::Sha224),
    SignatureAlgorithm::rsa_pss(HashAlgorithm::Sha256),
    SignatureAlgorithm::rsa_pss(HashAlgorithm::Sha384),
    SignatureAlgorithm::rsa_pss(HashAlgorithm::Sha512),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha1),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha224),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha256),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha384),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha512),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha3_224),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha3_256),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha3_384),
    SignatureAlgorithm::ecdsa(HashAlgorithm::Sha3_512),
];

/// Alternative names, mapped to canonical names.
pub const ALIASES: &[(&str, &str)] = &[
    // SHA1withRSA
    ("SHA1withRSAEncryption", "SHA1withRSA"),
    ("SHA1/RSA", "SHA1withRSA"),
    ("SHA-1/RSA", "SHA1withRSA"),
    ("1.2.840.113549.1.1.5", "SHA1withRSA"),
    ("OID.1.2.840.113549.1.1.5", "SHA1withRSA"),
    ("1.3.14.3.2.26with1.2.840.113549.1.1.1", "SHA1withRSA"),
    ("1.3.14.3.2.26with1.2.840.113549.1.1.5", "SHA1withRSA"),
    ("1.3.14.3.2.29", "SHA1withRSA"),
    ("OID.1.3.14.3.2.29", "SHA1withRSA"),
    // SHA224withRSA
    ("SHA224withRSAEncryption", "SHA224withRSA"),
    ("SHA224/RSA", "SHA224withRSA"),
    ("1.2.840.113549.1.1.14", "SHA224withRSA"),
    ("OID.1.2.840.113549.1.1.14", "SHA224withRSA"),
    ("2.16.840.1.101.3.4.2.4with1.2.840.113549.1.1.1", "SHA224withRSA"),
    ("2.16.840.1.101.3.4.2.4with1.2.840.113549.1.1.14", "SHA224withRSA"),
    // SHA256withRSA
    ("SHA256withRSAEncryption", "SHA256withRSA"),
    ("SHA256/RSA", "SHA256withRSA"),
    ("1.2.840.113549.1.1.11", "SHA256withRSA"),
    ("OID.1.2.840.113549.1.1.11", "SHA256withRSA"),
    ("2.16.840.1.101.3.4.2.1with1.2.840.113549.1.1.1", "SHA256withRSA"),
    ("2.16.840.1.101.3.4.2.1with1.2.840.113549.1.1.11", "SHA256withRSA"),
    // SHA384withRSA
    ("SHA384withRSAEncryption", "SHA384withRSA"),
    ("SHA384/RSA", "SHA384withRSA"),
    ("1.2.840.113549.1.1.12", "SHA384withRSA"),
    ("OID.1.2.840.113549.1.1.12", "SHA384withRSA"),
    ("2.16.840.1.101.3.4.2.2with1.2.840.113549.1.1.1", "SHA384withRSA"),
    // SHA512withRSA
    ("SHA512withRSAEncryption", "SHA512withRSA"),
    ("SHA512/RSA", "SHA512withRSA"),
    ("1.2.840.113549.1.1.13", "SHA512withRSA"),
    ("OID.1.2.840.113549.1.1.13", "SHA512withRSA"),
    ("2.16.840.1.101.3.4.2.3with1.2.840.113549.1.1.1", "SHA512withRSA"),
    // RSA-PSS
    ("SHA1withRSAandMGF1", "SHA1withRSA/PSS"),
    ("SHA224withRSAandMGF1", "SHA224withRSA/PSS"),
    ("SHA256withRSAandMGF1", "SHA256withRSA/PSS"),
    ("SHA384withRSAandMGF1", "SHA384withRSA/PSS"),
    ("SHA512withRSAandMGF1", "SHA512withRSA/PSS"),
    // SHA1withECDSA
    ("ECDSA", "SHA1withECDSA"),
    ("ECDSAwithSHA1", "SHA1withECDSA"),
    ("1.2.840.10045.4.1", "SHA1withECDSA"),
    ("1.3.14.3.2.26with1.2.840.10045.2.1", "SHA1withECDSA"),
    // SHA224withECDSA
    ("SHA224/ECDSA", "SHA224withECDSA"),
    ("1.2.840.10045.4.3.1", "SHA224withECDSA"),
    ("OID.1.2.840.10045.4.3.1", "SHA224withECDSA"),
    ("2.16.840.1.101.3.4.2.4with1.2.840.10045.2.1", "SHA224withECDSA"),
    // SHA256withECDSA
    ("SHA256/ECDSA", "SHA256withECDSA"),
    ("1.2.840.10045.4.3.2", "SHA256withECDSA"),
    ("OID.1.2.840.10045.4.3.2", "SHA256withECDSA"),
    ("2.16.840.1.101.3.4.2.1with1.2.840.10045.2.1", "SHA256withECDSA"),
    // SHA384withECDSA
    ("SHA384/ECDSA", "SHA384withECDSA"),
    ("1.2.840.10045.4.3.3", "SHA384withECDSA"),
    ("OID.1.2.840.10045.4.3.3", "SHA384withECDSA"),
    ("2.16.840.1.101.3.4.2.2with1.2.840.10045.2.1", "SHA384withECDSA"),
    // SHA512withECDSA
    ("SHA512/ECDSA", "SHA512withECDSA"),
    ("1.2.840.10045.4.3.4", "SHA512withECDSA"),
    ("OID.1.2.840.10045.4.3.4", "SHA512withECDSA"),
    ("2.16.840.1.101.3.4.2.3with1.2.840.10045.2.1", "SHA512withECDSA"),
    // SHA3 with ECDSA
    ("2.16.840.1.101.3.4.3.9", "SHA3-224withECDSA"),
    ("2.16.840.1.101.3.4.3.10", "SHA3-256withECDSA"),
    ("2.16.840.1.101.3.4.3.11", "SHA3-384withECDSA"),
    ("2.16.840.1.101.3.4.3.12", "SHA3-512withECDSA"),
];

/// Resolves a canonical name or alias, ignoring ASCII case.
///
/// # Errors
///
/// Returns [`SignatureError::UnsupportedAlgorithm`] for unknown identifiers.
pub fn lookup(identifier: &str) -> Result<SignatureAlgorithm, SignatureError> {
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(identifier))
        .map_or(identifier, |(_, canonical)| *canonical);

    ALGORITHMS
        .into_iter()
        .find(|alg| alg.name().eq_ignore_ascii_case(canonical))
        .ok_or_else(|| SignatureError::UnsupportedAlgorithm(identifier.to_string()))
}

/// Returns the supported scheme built from `hash`, `family` and `padding`.
pub fn find(
    hash: HashAlgorithm,
    family: KeyFamily,
    padding: Padding,
) -> Option<SignatureAlgorithm> {
    ALGORITHMS
        .into_iter()
        .find(|alg| alg.hash == hash && alg.family == family && alg.padding == padding)
}

/// Aliases registered for a canonical name.
pub fn aliases_of(canonical: &str) -> impl Iterator<Item = &'static str> + '_ {
    ALIASES
        .iter()
        .filter(move |(_, target)| target.eq_ignore_ascii_case(canonical))
        .map(|(alias, _)| *alias)
}
