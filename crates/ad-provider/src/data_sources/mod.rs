//! Read-only lookups of existing directory objects.

pub mod computer;
pub mod domain;
pub mod group;
pub mod orgunit;
pub mod user;

use async_trait::async_trait;

use ad_connector::operation::{Filter, SearchRequest, SearchScope};
use ad_connector_ldap::dn::domain_to_dn;

use crate::client::{AdClient, FoundObject};
use crate::data::ResourceData;
use crate::error::{ProviderError, ProviderResult};
use crate::schema::Schema;

pub use computer::ComputerDataSource;
pub use domain::DomainDataSource;
pub use group::GroupDataSource;
pub use orgunit::OrgUnitDataSource;
pub use user::UserDataSource;

/// A data source type.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Type name, e.g. `ad_group`.
    fn type_name(&self) -> &'static str;

    /// Attribute declarations.
    fn schema(&self) -> Schema;

    /// Look the object up and fill computed attributes.
    ///
    /// No match is a [`ProviderError::NotFound`], several matches are
    /// [`ProviderError::Ambiguous`].
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()>;
}

/// All data source handlers.
pub fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(ComputerDataSource),
        Box::new(DomainDataSource),
        Box::new(GroupDataSource),
        Box::new(OrgUnitDataSource),
        Box::new(UserDataSource),
    ]
}

/// Search location from the `dn`, `parent` and `domain` inputs, in that
/// order of preference. A DN is searched with base scope, the others with
/// subtree scope.
pub(crate) fn lookup_base(
    d: &ResourceData,
    with_domain: bool,
) -> ProviderResult<(String, SearchScope)> {
    let dn = d.get_string("dn");
    if !dn.is_empty() {
        return Ok((dn, SearchScope::Base));
    }

    let parent = d.get_string("parent");
    if !parent.is_empty() {
        return Ok((parent, SearchScope::Subtree));
    }

    let domain = d.get_string("domain");
    if with_domain && !domain.is_empty() {
        return Ok((domain_to_dn(&domain), SearchScope::Subtree));
    }

    let wanted = if with_domain {
        "one of 'dn', 'parent' or 'domain' must be set"
    } else {
        "one of 'dn' or 'parent' must be set"
    };
    Err(ProviderError::invalid_attribute("parent", wanted))
}

/// Run a lookup that must match exactly one entry.
pub(crate) async fn find_one(
    client: &AdClient,
    request: SearchRequest,
    kind: &str,
    name: &str,
) -> ProviderResult<FoundObject> {
    client
        .find_object(request, kind, name)
        .await?
        .ok_or_else(|| ProviderError::not_found(kind, name))
}

/// Build a lookup request from [`lookup_base`].
pub(crate) fn lookup_request(
    d: &ResourceData,
    with_domain: bool,
    filter: Filter,
    attributes: &[&str],
) -> ProviderResult<SearchRequest> {
    let (base, scope) = lookup_base(d, with_domain)?;
    Ok(SearchRequest::new(base, filter)
        .with_scope(scope)
        .with_attributes(attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> ResourceData {
        ResourceData::from_config(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_all_data_source_names() {
        let names: Vec<&str> = all().iter().map(|s| s.type_name()).collect();
        assert_eq!(names, vec!["ad_computer", "ad_domain", "ad_group", "ad_ou", "ad_user"]);
    }

    #[test]
    fn test_lookup_base_preference() {
        let d = data(json!({"dn": "cn=x,dc=a", "parent": "ou=p,dc=a", "domain": "a"}));
        assert_eq!(
            lookup_base(&d, true).unwrap(),
            ("cn=x,dc=a".to_string(), SearchScope::Base)
        );

        let d = data(json!({"parent": "ou=p,dc=a", "domain": "a"}));
        assert_eq!(
            lookup_base(&d, true).unwrap(),
            ("ou=p,dc=a".to_string(), SearchScope::Subtree)
        );

        let d = data(json!({"domain": "example.com"}));
        assert_eq!(
            lookup_base(&d, true).unwrap(),
            ("dc=example,dc=com".to_string(), SearchScope::Subtree)
        );
    }

    #[test]
    fn test_lookup_base_requires_location() {
        let d = data(json!({"domain": "example.com"}));
        assert!(matches!(
            lookup_base(&d, false),
            Err(ProviderError::InvalidAttribute { .. })
        ));
        assert!(lookup_base(&data(json!({})), true).is_err());
    }
}
