//! Read-only key store over transit keys.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use vaultsign_crypto::{codec, Certificate};
use vaultsign_transit::{Client, RemoteKey};

use crate::error::KeyStoreError;
use crate::version::{self, MIN_VERSION};

/// Format of key version creation times.
/// Accepts any fraction of a second from none up to nanoseconds.
pub const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Parses a key version creation time.
pub fn parse_creation_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, CREATION_TIME_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Key store whose entries are the transit keys of a KMS.
///
/// Aliases are key names. Every lookup reads the key again; nothing is
/// cached. Only signing keys are exposed and nothing can be written.
#[derive(Clone)]
pub struct VaultKeyStore {
    client: Arc<dyn Client>,
}

impl VaultKeyStore {
    /// Creates a key store over `client`.
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &Arc<dyn Client> {
        &self.client
    }

    /// Authenticates when a token is given, then checks that the KMS is
    /// initialized, unsealed and recent enough.
    pub async fn load(&self, token: Option<&str>) -> Result<(), KeyStoreError> {
        if let Some(token) = token {
            self.client.authenticate(token).await?;
        }

        let status = self.client.status().await?;

        if !status.initialized {
            return Err(KeyStoreError::NotInitializedVault);
        }
        if status.sealed {
            return Err(KeyStoreError::Sealed);
        }
        if !version::is_at_least(&status.version, MIN_VERSION) {
            return Err(KeyStoreError::VersionTooOld {
                found: status.version,
                minimum: MIN_VERSION,
            });
        }

        info!(version = %status.version, "Key store loaded");
        Ok(())
    }

    /// Key names, in the order the KMS lists them.
    pub async fn aliases(&self) -> Result<Vec<String>, KeyStoreError> {
        Ok(self.client.list().await?)
    }

    /// Whether a key exists under `alias`. Read failures count as absent.
    pub async fn contains_alias(&self, alias: &str) -> bool {
        match self.client.read(alias).await {
            Ok(key) => key.is_some(),
            Err(e) => {
                warn!(alias = %alias, error = %e, "Key lookup failed");
                false
            }
        }
    }

    /// Same as [`Self::contains_alias`]; every entry is a key entry.
    pub async fn is_key_entry(&self, alias: &str) -> bool {
        self.contains_alias(alias).await
    }

    /// Returns the key under `alias`.
    pub async fn key(&self, alias: &str) -> Result<Arc<RemoteKey>, KeyStoreError> {
        self.client
            .read(alias)
            .await?
            .map(Arc::new)
            .ok_or_else(|| KeyStoreError::KeyNotFound(alias.to_string()))
    }

    /// Certificate chain of the latest key version, leaf first.
    ///
    /// A version without a chain, or with one that does not decode, yields an
    /// empty chain.
    pub async fn certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>, KeyStoreError> {
        let key = self.key(alias).await?;

        let Some(pem) = key.latest().certificate_chain.as_deref() else {
            debug!(alias = %alias, "Key has no certificate chain");
            return Ok(Vec::new());
        };

        match codec::decode_certificate_chain(pem) {
            Ok(chain) => Ok(chain),
            Err(e) => {
                warn!(alias = %alias, error = %e, "Discarding undecodable certificate chain");
                Ok(Vec::new())
            }
        }
    }

    /// Leaf certificate of the latest key version, if any.
    pub async fn certificate(&self, alias: &str) -> Option<Certificate> {
        match self.certificate_chain(alias).await {
            Ok(chain) => chain.into_iter().next(),
            Err(e) => {
                warn!(alias = %alias, error = %e, "Certificate lookup failed");
                None
            }
        }
    }

    /// Creation time of the latest key version.
    pub async fn creation_date(&self, alias: &str) -> Option<DateTime<Utc>> {
        let key = match self.client.read(alias).await {
            Ok(Some(key)) => key,
            Ok(None) => return None,
            Err(e) => {
                warn!(alias = %alias, error = %e, "Key lookup failed");
                return None;
            }
        };

        let raw = key.latest().creation_time.as_deref()?;
        match parse_creation_time(raw) {
            Ok(date) => Some(date),
            Err(e) => {
                warn!(alias = %alias, value = %raw, error = %e, "Unparseable creation time");
                None
            }
        }
    }

    // ========================================================================
    // Unsupported
    // ========================================================================

    /// Not supported.
    pub fn delete_entry(&self, _alias: &str) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::NotSupported("delete_entry"))
    }

    /// Not supported.
    pub fn set_certificate_entry(
        &self,
        _alias: &str,
        _certificate: &Certificate,
    ) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::NotSupported("set_certificate_entry"))
    }

    /// Not supported.
    pub fn set_key_entry(
        &self,
        _alias: &str,
        _key: &[u8],
        _chain: &[Certificate],
    ) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::NotSupported("set_key_entry"))
    }

    /// Not supported.
    pub fn store(&self) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::NotSupported("store"))
    }

    /// Not supported.
    pub fn size(&self) -> Result<usize, KeyStoreError> {
        Err(KeyStoreError::NotSupported("size"))
    }

    /// Not supported.
    pub fn certificate_alias(&self, _certificate: &Certificate) -> Result<String, KeyStoreError> {
        Err(KeyStoreError::NotSupported("certificate_alias"))
    }

    /// Not supported.
    pub fn is_certificate_entry(&self, _alias: &str) -> Result<bool, KeyStoreError> {
        Err(KeyStoreError::NotSupported("is_certificate_entry"))
    }
}

impl std::fmt::Debug for VaultKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKeyStore").finish_non_exhaustive()
    }
}
