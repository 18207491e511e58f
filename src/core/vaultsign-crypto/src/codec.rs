//! PEM decoding of public keys and certificate chains.
//!
//! The KMS publishes each key version's public key as a PEM `PUBLIC KEY`
//! block (DER SubjectPublicKeyInfo) and, optionally, a certificate chain as a
//! sequence of PEM `CERTIFICATE` blocks, leaf first.

use pkcs8::der::Decode;
use pkcs8::spki::SubjectPublicKeyInfoRef;

use crate::error::CryptoError;

/// PEM tag of a SubjectPublicKeyInfo block.
pub const PUBLIC_KEY_TAG: &str = "PUBLIC KEY";

/// PEM tag of an X.509 certificate block.
pub const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// A DER-encoded X.509 certificate.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Parses DER bytes as an X.509 certificate and keeps the encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidDer`] if the bytes are not exactly one
    /// well-formed certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, CryptoError> {
        let der = der.into();
        x509_cert::Certificate::from_der(&der)
            .map_err(|e| CryptoError::InvalidDer(e.to_string()))?;
        Ok(Self { der })
    }

    /// Returns the DER encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Re-encodes the certificate as a PEM block.
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(CERTIFICATE_TAG, self.der.clone()))
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Decodes a PEM `PUBLIC KEY` block into DER SubjectPublicKeyInfo bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPem`] if the input is not PEM or carries a
/// different tag, and [`CryptoError::InvalidDer`] if its contents are not
/// exactly one SubjectPublicKeyInfo.
pub fn decode_public_key(input: &str) -> Result<Vec<u8>, CryptoError> {
    let block = pem::parse(input).map_err(|e| CryptoError::InvalidPem(e.to_string()))?;

    if block.tag() != PUBLIC_KEY_TAG {
        return Err(CryptoError::InvalidPem(format!(
            "expected {PUBLIC_KEY_TAG}, got {}",
            block.tag()
        )));
    }

    let der = block.into_contents();
    // from_der fails on trailing bytes
    SubjectPublicKeyInfoRef::from_der(&der)
        .map_err(|e| CryptoError::InvalidDer(e.to_string()))?;

    Ok(der)
}

/// Decodes a PEM certificate chain, preserving order.
///
/// Blank input yields an empty chain.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPem`] if the input is malformed or contains
/// a block that is not a certificate, and [`CryptoError::InvalidDer`] if a
/// certificate block does not parse as X.509.
pub fn decode_certificate_chain(input: &str) -> Result<Vec<Certificate>, CryptoError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let blocks = pem::parse_many(input).map_err(|e| CryptoError::InvalidPem(e.to_string()))?;

    blocks
        .into_iter()
        .map(|block| {
            if block.tag() == CERTIFICATE_TAG {
                Certificate::from_der(block.into_contents())
            } else {
                Err(CryptoError::InvalidPem(format!(
                    "expected {CERTIFICATE_TAG}, got {}",
                    block.tag()
                )))
            }
        })
        .collect()
}
