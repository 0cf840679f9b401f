//! LDAP directory client
//!
//! Implements the connector capability traits for Active Directory over
//! `ldap3`.

use std::collections::HashSet;
use std::sync::Arc;

use ad_connector::config::ConnectorConfig;
use ad_connector::error::{ConnectorError, ConnectorResult};
use ad_connector::operation::{
    AttributeDelta, AttributeSet, AttributeValue, Filter, SearchRequest, SearchResult,
    SearchScope, Uid,
};
use ad_connector::traits::{Connector, CreateOp, DeleteOp, RenameOp, SearchOp, UpdateOp};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Mod, Scope, SearchEntry};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::ad::controls::{extended_dn_control, ExtendedDnFormat};
use crate::ad::modify::renamed_dn;
use crate::config::ActiveDirectoryConfig;

/// Message reported when the server cannot be reached or the bind fails.
const CONNECT_ERROR: &str = "Error while trying to connect active directory server, \
                             check server IP address, username or password";

/// Active Directory client over LDAP.
pub struct LdapDirectory {
    /// Configuration.
    config: ActiveDirectoryConfig,

    /// Display name for this connector instance.
    display_name: String,

    /// Cached LDAP connection (lazily initialized).
    connection: Arc<RwLock<Option<Ldap>>>,

    /// Whether the connector has been disposed.
    disposed: Arc<RwLock<bool>>,
}

impl LdapDirectory {
    /// Create a new directory client with the given configuration.
    ///
    /// No connection is made until the first operation.
    pub fn new(config: ActiveDirectoryConfig) -> ConnectorResult<Self> {
        config.validate()?;
        config.ldap.tls.warn_if_insecure(config.ldap.use_ssl);

        let display_name = format!("AD: {} ({})", config.domain, config.ldap.host);

        Ok(Self {
            config,
            display_name,
            connection: Arc::new(RwLock::new(None)),
            disposed: Arc::new(RwLock::new(false)),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ActiveDirectoryConfig {
        &self.config
    }

    /// Whether the transport is encrypted.
    pub fn uses_ssl(&self) -> bool {
        self.config.ldap.use_ssl
    }

    /// Get an LDAP connection, creating one if necessary.
    async fn get_connection(&self) -> ConnectorResult<Ldap> {
        if *self.disposed.read().await {
            return Err(ConnectorError::Disposed);
        }

        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;
        // Another task may have connected while we waited for the lock.
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let conn = self.create_connection().await?;
        *conn_guard = Some(conn.clone());

        Ok(conn)
    }

    /// Create a new LDAP connection and bind.
    async fn create_connection(&self) -> ConnectorResult<Ldap> {
        let ldap_config = &self.config.ldap;
        let url = ldap_config.url();

        debug!(url = %url, "Connecting to AD server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(ldap_config.connection.connection_timeout())
            .set_no_tls_verify(ldap_config.tls.is_insecure(ldap_config.use_ssl));

        let timeout_secs = ldap_config.connection.connection_timeout_secs;
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| connect_error(e, timeout_secs))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &ldap_config.bind_dn;
        let bind_password = ldap_config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .with_timeout(ldap_config.connection.connection_timeout())
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| connect_error(e, timeout_secs))?;

        match result.rc {
            0 => {}
            49 => {
                warn!(bind_dn = %bind_dn, "AD bind rejected: invalid credentials");
                return Err(ConnectorError::AuthenticationFailed);
            }
            rc => {
                return Err(ConnectorError::connection_failed(format!(
                    "{CONNECT_ERROR}: bind failed with code {rc}: {}",
                    result.text
                )));
            }
        }

        info!(host = %ldap_config.host, domain = %self.config.domain, "AD connection established");

        Ok(ldap)
    }

    /// Forget the cached connection after a transport failure and wrap the error.
    async fn transport_error(&self, operation: &str, error: LdapError) -> ConnectorError {
        self.connection.write().await.take();
        ConnectorError::network_with_source(format!("LDAP {operation} failed"), error)
    }

    /// Get a connection with the per-operation timeout applied.
    async fn operation_connection(&self) -> ConnectorResult<Ldap> {
        let mut ldap = self.get_connection().await?;
        ldap.with_timeout(self.config.ldap.connection.operation_timeout());
        Ok(ldap)
    }
}

/// Wrap a failure to connect or bind.
fn connect_error(error: LdapError, timeout_secs: u64) -> ConnectorError {
    match error {
        LdapError::Timeout { .. } => ConnectorError::ConnectionTimeout { timeout_secs },
        e => ConnectorError::connection_failed_with_source(CONNECT_ERROR, e),
    }
}

/// Map an LDAP result code to a connector error.
pub fn map_result_code(rc: u32, text: &str, identifier: &str, operation: &str) -> ConnectorResult<()> {
    match rc {
        0 => Ok(()),
        32 => Err(ConnectorError::ObjectNotFound {
            identifier: identifier.to_string(),
        }),
        // entryAlreadyExists, attributeOrValueExists
        68 | 20 => Err(ConnectorError::ObjectAlreadyExists {
            identifier: identifier.to_string(),
        }),
        49 => Err(ConnectorError::AuthenticationFailed),
        50 => Err(ConnectorError::AuthorizationFailed {
            operation: operation.to_string(),
        }),
        19 | 53 => Err(ConnectorError::ConstraintViolation {
            message: format!("{operation} on {identifier}: {text}"),
        }),
        // busy, unavailable
        51 | 52 => Err(ConnectorError::ServerUnavailable {
            code: rc,
            message: format!("{operation} on {identifier}: {text}"),
        }),
        _ => Err(ConnectorError::operation_failed(format!(
            "LDAP {operation} failed with code {rc}: {text}"
        ))),
    }
}

/// Convert a filter to its LDAP string form (RFC 4515).
pub fn filter_to_ldap(filter: &Filter) -> String {
    match filter {
        Filter::And { filters } => {
            let inner: Vec<String> = filters.iter().map(filter_to_ldap).collect();
            format!("(&{})", inner.join(""))
        }
        Filter::Equals { attribute, value } => {
            format!("({}={})", attribute, escape_ldap_value(value))
        }
        Filter::EqualsEscaped { attribute, value } => format!("({attribute}={value})"),
        Filter::Present { attribute } => format!("({attribute}=*)"),
    }
}

/// Escape special characters in LDAP filter values (RFC 4515).
pub fn escape_ldap_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

fn ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// Convert attribute values to the octet sets ldap3 expects.
fn octet_set(value: &AttributeValue) -> HashSet<Vec<u8>> {
    value.to_octets().into_iter().collect()
}

/// Convert an LDAP search entry to an `AttributeSet`.
fn entry_to_attribute_set(entry: SearchEntry) -> AttributeSet {
    let mut attrs = AttributeSet::new();

    attrs.set("dn", entry.dn);

    for (name, values) in entry.attrs {
        if values.len() == 1 {
            attrs.set(name, values.into_iter().next().unwrap_or_default());
        } else if !values.is_empty() {
            attrs.set(name, values);
        }
    }

    for (name, values) in entry.bin_attrs {
        if values.len() == 1 {
            attrs.set(name, AttributeValue::Binary(values.into_iter().next().unwrap_or_default()));
        } else if !values.is_empty() {
            attrs.set(
                name,
                AttributeValue::Array(values.into_iter().map(AttributeValue::Binary).collect()),
            );
        }
    }

    attrs
}

/// Build the ldap3 modification list for a delta.
fn delta_to_mods(changes: &AttributeDelta) -> Vec<Mod<Vec<u8>>> {
    let mut mods: Vec<Mod<Vec<u8>>> = Vec::new();

    for (name, value) in &changes.replace {
        mods.push(Mod::Replace(name.as_bytes().to_vec(), octet_set(value)));
    }

    for (name, value) in &changes.add {
        mods.push(Mod::Add(name.as_bytes().to_vec(), octet_set(value)));
    }

    for (name, value) in &changes.remove {
        mods.push(Mod::Delete(name.as_bytes().to_vec(), octet_set(value)));
    }

    for name in &changes.clear {
        mods.push(Mod::Delete(name.as_bytes().to_vec(), HashSet::new()));
    }

    mods
}

#[async_trait]
impl Connector for LdapDirectory {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    #[instrument(skip(self))]
    async fn test_connection(&self) -> ConnectorResult<()> {
        let request = SearchRequest::new(self.config.domain_dn(), Filter::present("objectClass"))
            .with_scope(SearchScope::Base)
            .with_attributes(&["dc"]);

        let result = self.search(request).await.map_err(|e| match e {
            ConnectorError::ObjectNotFound { identifier } => ConnectorError::connection_failed(
                format!("domain root '{identifier}' not found or not accessible"),
            ),
            other => other,
        })?;

        if result.objects.is_empty() {
            return Err(ConnectorError::connection_failed(format!(
                "domain root '{}' not found or not accessible",
                self.config.domain_dn()
            )));
        }

        info!("AD connection test successful");
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        *self.disposed.write().await = true;

        let mut conn_guard = self.connection.write().await;
        if let Some(mut ldap) = conn_guard.take() {
            if let Err(e) = ldap.unbind().await {
                warn!(error = %e, "Error during LDAP unbind");
            }
        }

        info!("AD directory client disposed");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.disposed.try_read().map(|d| !*d).unwrap_or(true)
    }
}

#[async_trait]
impl CreateOp for LdapDirectory {
    #[instrument(skip(self, attributes))]
    async fn create(&self, dn: &str, attributes: AttributeSet) -> ConnectorResult<Uid> {
        let mut ldap = self.operation_connection().await?;

        debug!(dn = %dn, attribute_count = attributes.len(), "Creating AD entry");

        let ldap_attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attributes
            .iter()
            .filter(|(name, _)| name.as_str() != "dn")
            .map(|(name, value)| (name.as_bytes().to_vec(), octet_set(value)))
            .filter(|(_, values)| !values.is_empty())
            .collect();

        let result = match ldap.add(dn, ldap_attrs).await {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("add", e).await),
        };
        map_result_code(result.rc, &result.text, dn, "add")?;

        info!(dn = %dn, "AD entry created");

        Ok(Uid::from_dn(dn))
    }
}

#[async_trait]
impl UpdateOp for LdapDirectory {
    #[instrument(skip(self, changes), fields(attributes = ?changes.affected_attributes()))]
    async fn update(&self, uid: &Uid, changes: AttributeDelta) -> ConnectorResult<Uid> {
        let mods = delta_to_mods(&changes);
        if mods.is_empty() {
            return Ok(uid.clone());
        }

        let mut ldap = self.operation_connection().await?;
        let dn = uid.value();

        debug!(dn = %dn, "Modifying AD entry");

        let result = match ldap.modify(dn, mods).await {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("modify", e).await),
        };
        map_result_code(result.rc, &result.text, dn, "modify")?;

        info!(dn = %dn, "AD entry modified");

        Ok(uid.clone())
    }
}

#[async_trait]
impl RenameOp for LdapDirectory {
    #[instrument(skip(self))]
    async fn rename(
        &self,
        uid: &Uid,
        new_rdn: &str,
        new_parent: Option<&str>,
    ) -> ConnectorResult<Uid> {
        let mut ldap = self.operation_connection().await?;
        let dn = uid.value();

        debug!(dn = %dn, new_rdn = %new_rdn, new_parent = ?new_parent, "Renaming AD entry");

        let result = match ldap.modifydn(dn, new_rdn, true, new_parent).await {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("modify-DN", e).await),
        };
        map_result_code(result.rc, &result.text, dn, "modify-DN")?;

        let new_dn = renamed_dn(dn, new_rdn, new_parent);
        info!(old_dn = %dn, new_dn = %new_dn, "AD entry renamed");

        Ok(Uid::from_dn(new_dn))
    }
}

#[async_trait]
impl DeleteOp for LdapDirectory {
    #[instrument(skip(self))]
    async fn delete(&self, uid: &Uid) -> ConnectorResult<()> {
        let mut ldap = self.operation_connection().await?;
        let dn = uid.value();

        debug!(dn = %dn, "Deleting AD entry");

        let result = match ldap.delete(dn).await {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("delete", e).await),
        };
        map_result_code(result.rc, &result.text, dn, "delete")?;

        info!(dn = %dn, "AD entry deleted");

        Ok(())
    }
}

#[async_trait]
impl SearchOp for LdapDirectory {
    #[instrument(skip(self))]
    async fn search(&self, request: SearchRequest) -> ConnectorResult<SearchResult> {
        let mut ldap = self.operation_connection().await?;

        let ldap_filter = filter_to_ldap(&request.filter);
        let attrs: Vec<&str> = if request.attributes.is_empty() {
            vec!["*"]
        } else {
            request.attributes.iter().map(String::as_str).collect()
        };

        debug!(
            filter = %ldap_filter,
            base = %request.base,
            extended_dn = request.extended_dn,
            "Searching AD"
        );

        if request.extended_dn {
            ldap.with_controls(vec![extended_dn_control(ExtendedDnFormat::Hex)?]);
        }

        let ldap3::SearchResult(entries, result) = match ldap
            .search(&request.base, ldap_scope(request.scope), &ldap_filter, attrs)
            .await
        {
            Ok(result) => result,
            Err(e) => return Err(self.transport_error("search", e).await),
        };
        map_result_code(result.rc, &result.text, &request.base, "search")?;

        let objects: Vec<AttributeSet> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(entry_to_attribute_set)
            .collect();

        debug!(found = objects.len(), "AD search completed");

        Ok(SearchResult::new(objects))
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("display_name", &self.display_name)
            .field("config", &self.config.redacted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> ActiveDirectoryConfig {
        ActiveDirectoryConfig::from_domain("example.com", "admin", "secret").with_host("10.0.0.5")
    }

    #[test]
    fn test_filter_to_ldap_equals() {
        let filter = Filter::eq("cn", "web01");
        assert_eq!(filter_to_ldap(&filter), "(cn=web01)");
    }

    #[test]
    fn test_filter_to_ldap_composite() {
        let filter = Filter::and(vec![
            Filter::eq("objectClass", "group"),
            Filter::eq("cn", "App"),
            Filter::present("description"),
        ]);
        assert_eq!(
            filter_to_ldap(&filter),
            "(&(objectClass=group)(cn=App)(description=*))"
        );
    }

    #[test]
    fn test_filter_to_ldap_escaped_value_untouched() {
        let filter = Filter::eq_escaped("objectGUID", "\\a1\\b2");
        assert_eq!(filter_to_ldap(&filter), "(objectGUID=\\a1\\b2)");
    }

    #[test]
    fn test_escape_ldap_value() {
        assert_eq!(escape_ldap_value("a*b"), "a\\2ab");
        assert_eq!(escape_ldap_value("(x)"), "\\28x\\29");
        assert_eq!(escape_ldap_value("a\\b"), "a\\5cb");
        assert_eq!(escape_ldap_value("nul\0"), "nul\\00");
        assert_eq!(escape_ldap_value("plain"), "plain");
    }

    #[test]
    fn test_injection_attempt_is_escaped() {
        let filter = Filter::eq("sAMAccountName", "*)(objectClass=*");
        assert_eq!(
            filter_to_ldap(&filter),
            "(sAMAccountName=\\2a\\29\\28objectClass=\\2a)"
        );
    }

    #[tokio::test]
    async fn test_connect_error_timeout() {
        let elapsed = tokio::time::timeout(
            std::time::Duration::ZERO,
            std::future::pending::<()>(),
        )
        .await
        .unwrap_err();

        let err = connect_error(LdapError::from(elapsed), 30);
        assert!(matches!(err, ConnectorError::ConnectionTimeout { timeout_secs: 30 }));
        assert!(err.is_transient());

        let err = connect_error(LdapError::FilterParsing, 30);
        assert!(matches!(err, ConnectorError::ConnectionFailed { .. }));
        assert!(err.to_string().contains("check server IP address"));
    }

    #[test]
    fn test_map_result_code() {
        assert!(map_result_code(0, "", "cn=x", "add").is_ok());
        assert!(matches!(
            map_result_code(32, "", "cn=x", "delete"),
            Err(ConnectorError::ObjectNotFound { .. })
        ));
        assert!(matches!(
            map_result_code(68, "", "cn=x", "add"),
            Err(ConnectorError::ObjectAlreadyExists { .. })
        ));
        assert!(matches!(
            map_result_code(49, "", "cn=x", "bind"),
            Err(ConnectorError::AuthenticationFailed)
        ));
        assert!(matches!(
            map_result_code(50, "", "cn=x", "modify"),
            Err(ConnectorError::AuthorizationFailed { .. })
        ));
        assert!(matches!(
            map_result_code(19, "password policy", "cn=x", "modify"),
            Err(ConnectorError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            map_result_code(53, "unwilling", "cn=x", "modify"),
            Err(ConnectorError::ConstraintViolation { .. })
        ));
        assert!(map_result_code(52, "", "cn=x", "search")
            .unwrap_err()
            .is_transient());

        let err = map_result_code(80, "other", "cn=x", "add").unwrap_err();
        assert_eq!(err.error_code(), "OPERATION_FAILED");
        assert!(err.to_string().contains("code 80"));
    }

    #[test]
    fn test_delta_to_mods() {
        let mut delta = AttributeDelta::new();
        delta
            .replace("description", "x")
            .add("member", "cn=a,dc=x")
            .clear_attribute("info");

        let mods = delta_to_mods(&delta);
        assert_eq!(mods.len(), 3);
        assert!(matches!(&mods[0], Mod::Replace(name, _) if name == b"description"));
        assert!(matches!(&mods[1], Mod::Add(name, _) if name == b"member"));
        assert!(matches!(&mods[2], Mod::Delete(name, values) if name == b"info" && values.is_empty()));
    }

    #[test]
    fn test_entry_to_attribute_set() {
        let mut attrs = HashMap::new();
        attrs.insert("cn".to_string(), vec!["Admins".to_string()]);
        attrs.insert(
            "member".to_string(),
            vec!["cn=a,dc=x".to_string(), "cn=b,dc=x".to_string()],
        );
        let entry = SearchEntry {
            dn: "<GUID=ab>;CN=Admins,DC=x".to_string(),
            attrs,
            bin_attrs: HashMap::new(),
        };

        let set = entry_to_attribute_set(entry);
        assert_eq!(set.dn(), Some("<GUID=ab>;CN=Admins,DC=x"));
        assert_eq!(set.get_string("cn"), Some("Admins"));
        assert_eq!(set.get_strings("member").len(), 2);
    }

    #[test]
    fn test_new_validates_config() {
        assert!(LdapDirectory::new(test_config()).is_ok());

        let mut config = test_config();
        config.ldap.host.clear();
        assert!(LdapDirectory::new(config).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let directory = LdapDirectory::new(test_config()).unwrap();
        let debug = format!("{directory:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("AD: example.com (10.0.0.5)"));
    }

    #[tokio::test]
    async fn test_disposed_directory_rejects_operations() {
        let directory = LdapDirectory::new(test_config()).unwrap();
        directory.dispose().await.unwrap();

        assert!(!directory.is_healthy());
        let err = directory.delete(&Uid::from_dn("cn=x,dc=example,dc=com")).await;
        assert!(matches!(err, Err(ConnectorError::Disposed)));
    }
}
