//! Managed resources.
//!
//! Every handler follows the same lifecycle: create then read, update then
//! read, and delete after a read that tolerates the object being gone.

pub mod computer;
pub mod group;
pub mod orgunit;
pub mod user;
pub mod user_attachment;

use async_trait::async_trait;

use ad_connector::operation::{Filter, SearchRequest};
use ad_connector_ldap::dn::{dn_eq, domain_to_dn};

use crate::client::{guid_filter, AdClient};
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::Schema;

pub use computer::ComputerResource;
pub use group::GroupResource;
pub use orgunit::OrgUnitResource;
pub use user::UserResource;
pub use user_attachment::UserAttachmentResource;

/// A resource type managed in the directory.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name, e.g. `ad_group`.
    fn type_name(&self) -> &'static str;

    /// Attribute declarations.
    fn schema(&self) -> Schema;

    /// Create the object and record its id.
    async fn create(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()>;

    /// Refresh state from the directory. Clears the id when the object is gone.
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()>;

    /// Apply in-place changes relative to the prior state.
    async fn update(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()>;

    /// Remove the object. Succeeds when it is already gone.
    async fn delete(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()>;
}

/// All resource handlers.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(ComputerResource),
        Box::new(GroupResource),
        Box::new(OrgUnitResource),
        Box::new(UserResource),
        Box::new(UserAttachmentResource),
    ]
}

/// Search for an object of `object_class` under the domain root: by
/// objectGUID once the id is known, otherwise by `fallback`.
pub(crate) fn identity_request(
    object_class: &str,
    d: &ResourceData,
    fallback: Filter,
    attributes: &[&str],
) -> SearchRequest {
    let base = domain_to_dn(&d.get_string("domain"));
    let filter = if d.id().is_empty() {
        Filter::and(vec![Filter::eq("objectClass", object_class), fallback])
    } else {
        guid_filter(object_class, d.id())
    };
    SearchRequest::new(base, filter).with_attributes(attributes)
}

/// Keep the configured spelling of a DN when the directory reports the same
/// name with different case or spacing.
pub(crate) fn reconcile_dn(configured: &str, actual: &str) -> String {
    if !configured.is_empty() && dn_eq(configured, actual) {
        configured.to_string()
    } else {
        actual.to_string()
    }
}

/// [`reconcile_dn`] over a set of DNs.
pub(crate) fn reconcile_dns(configured: &[String], actual: &[&str]) -> Vec<String> {
    actual
        .iter()
        .map(|dn| {
            configured
                .iter()
                .find(|c| dn_eq(c, dn))
                .cloned()
                .unwrap_or_else(|| (*dn).to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_resource_names() {
        let names: Vec<&str> = all().iter().map(|r| r.type_name()).collect();
        assert_eq!(
            names,
            vec!["ad_computer", "ad_group", "ad_ou", "ad_user", "ad_user_attachment"]
        );
    }

    #[test]
    fn test_identity_request() {
        let mut d = ResourceData::from_config(
            serde_json::json!({"domain": "example.com"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let fallback = Filter::eq("distinguishedName", "cn=G,dc=example,dc=com");

        let request = identity_request("group", &d, fallback.clone(), &["cn"]);
        assert_eq!(request.base, "dc=example,dc=com");
        assert_eq!(
            request.filter,
            Filter::and(vec![Filter::eq("objectClass", "group"), fallback.clone()])
        );

        d.set_id("a1b2");
        let request = identity_request("group", &d, fallback, &["cn"]);
        assert_eq!(request.filter, guid_filter("group", "a1b2"));
    }

    #[test]
    fn test_reconcile_dn() {
        assert_eq!(
            reconcile_dn("ou=Groups,dc=x", "OU=Groups,DC=x"),
            "ou=Groups,dc=x"
        );
        assert_eq!(reconcile_dn("ou=A,dc=x", "OU=B,DC=x"), "OU=B,DC=x");
        assert_eq!(reconcile_dn("", "OU=B,DC=x"), "OU=B,DC=x");
    }

    #[test]
    fn test_reconcile_dns() {
        let configured = vec!["cn=a,dc=x".to_string()];
        assert_eq!(
            reconcile_dns(&configured, &["CN=a,DC=x", "CN=b,DC=x"]),
            vec!["cn=a,dc=x".to_string(), "CN=b,DC=x".to_string()]
        );
    }
}
