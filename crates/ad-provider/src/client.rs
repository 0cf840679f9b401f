//! Directory handle shared by resource and data source handlers.

use std::sync::Arc;

use ad_connector::error::ConnectorError;
use ad_connector::operation::{AttributeSet, AttributeValue, Filter, SearchRequest};
use ad_connector::traits::Directory;
use ad_connector_ldap::dn::{object_guid_query, ExtendedDn};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Configured directory plus the transport facts handlers need.
#[derive(Clone)]
pub struct AdClient {
    directory: Arc<dyn Directory>,
    use_ssl: bool,
}

/// An entry located through an extended-DN search.
#[derive(Debug, Clone)]
pub struct FoundObject {
    /// Hexadecimal objectGUID.
    pub guid: String,
    /// Plain DN.
    pub dn: String,
    /// Returned attributes.
    pub attributes: AttributeSet,
}

impl AdClient {
    pub fn new(directory: Arc<dyn Directory>, use_ssl: bool) -> Self {
        Self { directory, use_ssl }
    }

    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    /// Whether the connection is encrypted (required for passwords).
    pub fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    /// Run a search that must match at most one entry.
    ///
    /// A missing search base counts as no match.
    pub async fn search_unique(
        &self,
        request: SearchRequest,
        kind: &str,
        name: &str,
    ) -> ProviderResult<Option<AttributeSet>> {
        let result = match self.directory.search(request).await {
            Ok(result) => result,
            Err(ConnectorError::ObjectNotFound { identifier }) => {
                debug!(kind = %kind, base = %identifier, "Search base does not exist");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut objects = result.objects.into_iter();
        let first = objects.next();
        if objects.next().is_some() {
            return Err(ProviderError::ambiguous(kind, name));
        }
        Ok(first)
    }

    /// Like [`search_unique`](Self::search_unique) with the extended-DN
    /// control, splitting the returned DN into GUID and plain DN.
    pub async fn find_object(
        &self,
        request: SearchRequest,
        kind: &str,
        name: &str,
    ) -> ProviderResult<Option<FoundObject>> {
        let Some(attributes) = self
            .search_unique(request.with_extended_dn(), kind, name)
            .await?
        else {
            return Ok(None);
        };

        let parsed = ExtendedDn::parse(attributes.dn().unwrap_or_default());
        let guid = if parsed.guid.is_empty() {
            binary_guid_hex(&attributes).unwrap_or_default()
        } else {
            parsed.guid
        };

        Ok(Some(FoundObject {
            guid,
            dn: parsed.dn,
            attributes,
        }))
    }
}

impl std::fmt::Debug for AdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdClient")
            .field("directory", &self.directory.display_name())
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

/// `(&(objectClass=<class>)(objectGUID=\xx\xx...))`.
pub fn guid_filter(object_class: &str, guid: &str) -> Filter {
    Filter::and(vec![
        Filter::eq("objectClass", object_class),
        Filter::eq_escaped("objectGUID", object_guid_query(guid)),
    ])
}

/// Hex form of a binary objectGUID attribute, for servers that ignore the
/// extended-DN control.
fn binary_guid_hex(attributes: &AttributeSet) -> Option<String> {
    match attributes.get("objectGUID")? {
        AttributeValue::Binary(bytes) if !bytes.is_empty() => {
            Some(bytes.iter().map(|b| format!("{b:02x}")).collect())
        }
        _ => None,
    }
}
