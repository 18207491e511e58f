//! HTTP transport configuration.

use std::time::Duration;

use tracing::warn;

/// Default KMS address.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8200";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the KMS address.
pub const ENV_ADDRESS: &str = "VAULT_ADDR";

/// Environment variable holding the KMS namespace.
pub const ENV_NAMESPACE: &str = "VAULT_NAMESPACE";

/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT: &str = "VAULT_CLIENT_TIMEOUT";

/// Where and how to reach the KMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Base URL, e.g. `https://vault.example.com:8200`.
    pub address: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Enterprise namespace sent as `X-Vault-Namespace`.
    pub namespace: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            timeout: DEFAULT_TIMEOUT,
            namespace: None,
        }
    }
}

impl HttpTransportConfig {
    /// Configuration for `address` with default settings.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Reads `VAULT_ADDR`, `VAULT_NAMESPACE` and `VAULT_CLIENT_TIMEOUT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(address) = lookup(ENV_ADDRESS).filter(|a| !a.is_empty()) {
            config.address = address;
        }

        config.namespace = lookup(ENV_NAMESPACE).filter(|n| !n.is_empty());

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            match raw.trim_end_matches('s').parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %raw, "Ignoring invalid {ENV_TIMEOUT}"),
            }
        }

        config
    }

    /// Overrides the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}
