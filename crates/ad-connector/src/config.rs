//! Shared configuration pieces for directory backends.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ConnectorResult;

/// Placeholder written over secrets in redacted configurations.
pub const REDACTED: &str = "***REDACTED***";

/// Backend configuration that can check itself and hide its secrets.
pub trait ConnectorConfig: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Reject incomplete or contradictory settings before any connection
    /// attempt.
    fn validate(&self) -> ConnectorResult<()>;

    /// Copy with passwords replaced by [`REDACTED`], for logs.
    fn redacted(&self) -> Self;
}

/// Timeouts for reaching the server and for each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Limit for TCP connect, TLS handshake and bind.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Limit for a single search or modification.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_operation_timeout() -> u64 {
    60
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

impl ConnectionSettings {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Certificate handling for LDAPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Check the server certificate against the system roots.
    #[serde(default = "default_verify")]
    pub verify_certificate: bool,
}

fn default_verify() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify_certificate: default_verify(),
        }
    }
}

impl TlsConfig {
    /// Whether a TLS connection would skip certificate checks.
    pub fn is_insecure(&self, use_ssl: bool) -> bool {
        use_ssl && !self.verify_certificate
    }

    /// Warn once per connector when certificate checks are off.
    pub fn warn_if_insecure(&self, use_ssl: bool) {
        if self.is_insecure(use_ssl) {
            tracing::warn!(
                target: "security",
                "TLS certificate verification is disabled for the directory connection"
            );
        }
    }
}
