//! LDAP Connector configuration
//!
//! Configuration types for Active Directory connections.

use ad_connector::config::{ConnectionSettings, ConnectorConfig, TlsConfig, REDACTED};
use ad_connector::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};

use crate::dn::domain_to_dn;

/// Configuration for the LDAP transport.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Directory server hostname or IP address.
    pub host: String,

    /// Server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Base DN for all operations (e.g., "dc=example,dc=com").
    pub base_dn: String,

    /// Bind principal (e.g., "admin@example.com").
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection settings (timeouts).
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// TLS configuration.
    #[serde(default)]
    pub tls: TlsConfig,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| REDACTED))
            .field("connection", &self.connection)
            .field("tls", &self.tls)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection: ConnectionSettings::default(),
            tls: TlsConfig::default(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS) on port 636.
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl ConnectorConfig for LdapConfig {
    fn validate(&self) -> ConnectorResult<()> {
        if self.host.is_empty() {
            return Err(ConnectorError::invalid_configuration("host is required"));
        }

        if self.port == 0 {
            return Err(ConnectorError::invalid_configuration(
                "port must be greater than zero",
            ));
        }

        if self.base_dn.is_empty() {
            return Err(ConnectorError::invalid_configuration("base_dn is required"));
        }

        if self.bind_dn.is_empty() {
            return Err(ConnectorError::invalid_configuration("bind_dn is required"));
        }

        Ok(())
    }

    fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some(REDACTED.to_string());
        }
        config
    }
}

/// Configuration specific to Active Directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveDirectoryConfig {
    /// Base LDAP configuration.
    #[serde(flatten)]
    pub ldap: LdapConfig,

    /// AD domain name (e.g., "example.com").
    pub domain: String,
}

impl ActiveDirectoryConfig {
    /// Create a new AD config from domain name.
    ///
    /// Derives the base DN from the domain and the bind principal from the
    /// user name. SSL is on and the host defaults to the domain itself.
    #[must_use]
    pub fn from_domain(domain: &str, user: &str, password: &str) -> Self {
        Self {
            ldap: LdapConfig::new(domain, domain_to_dn(domain), bind_principal(user, domain))
                .with_password(password)
                .with_ssl(),
            domain: domain.to_string(),
        }
    }

    /// Set the directory server host (IP address or hostname).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.ldap.host = host.into();
        self
    }

    /// Switch between LDAPS on 636 and plain LDAP on 389.
    #[must_use]
    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        if use_ssl {
            self.ldap = self.ldap.with_ssl();
        } else {
            self.ldap.use_ssl = false;
            self.ldap.port = default_ldap_port();
        }
        self
    }

    /// Override the server port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.ldap.port = port;
        self
    }

    /// Skip TLS certificate verification.
    #[must_use]
    pub fn with_insecure_tls(mut self) -> Self {
        self.ldap.tls.verify_certificate = false;
        self
    }

    /// Set the connection timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.ldap.connection.connection_timeout_secs = secs;
        self
    }

    /// DN of the domain root (e.g., "dc=example,dc=com").
    #[must_use]
    pub fn domain_dn(&self) -> &str {
        &self.ldap.base_dn
    }
}

impl ConnectorConfig for ActiveDirectoryConfig {
    fn validate(&self) -> ConnectorResult<()> {
        if self.domain.is_empty() {
            return Err(ConnectorError::invalid_configuration("domain is required"));
        }
        self.ldap.validate()
    }

    fn redacted(&self) -> Self {
        Self {
            ldap: self.ldap.redacted(),
            domain: self.domain.clone(),
        }
    }
}

/// Build the bind principal for a user in a domain.
///
/// Plain account names become `user@domain`. Names that already carry a
/// realm (`user@domain`), a NetBIOS prefix (`DOMAIN\user`) or a DN are kept.
#[must_use]
pub fn bind_principal(user: &str, domain: &str) -> String {
    if user.contains('@') || user.contains('\\') || user.contains('=') || user.is_empty() {
        user.to_string()
    } else {
        format!("{user}@{domain}")
    }
}
