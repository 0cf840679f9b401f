//! `ad_domain` data source.

use async_trait::async_trait;
use tracing::{debug, instrument};

use ad_connector::operation::{Filter, SearchRequest, SearchScope};
use ad_connector_ldap::dn::{dn_to_domain, domain_to_dn, extract_domain_from_dn, rdn, split_dn};

use super::{find_one, DataSource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::{Attribute, Schema};

pub struct DomainDataSource;

impl DomainDataSource {
    /// `dc=<name>` followed by the components of the dotted parent.
    fn domain_dn(name: &str, parent: &str) -> String {
        let parent_dn = domain_to_dn(parent);
        if parent_dn.is_empty() {
            rdn("dc", name)
        } else {
            format!("{},{parent_dn}", rdn("dc", name))
        }
    }
}

#[async_trait]
impl DataSource for DomainDataSource {
    fn type_name(&self) -> &'static str {
        "ad_domain"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("Look up a domain object")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The first component of the domain name"),
            )
            .with_attribute(
                "parent",
                Attribute::optional_string()
                    .also_computed()
                    .with_description("The dotted name of the parent domain, may be empty"),
            )
            .with_attribute(
                "dn",
                Attribute::computed_string().with_description("The distinguished name of the domain"),
            )
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let dn = Self::domain_dn(&name, &d.get_string("parent"));
        debug!(dn = %dn, "Looking up domain");

        let request = SearchRequest::new(dn, Filter::eq("objectClass", "domain"))
            .with_scope(SearchScope::Base)
            .with_attributes(&["dc"]);

        let found = find_one(client, request, "domain", &name).await?;
        d.set_id(found.guid);
        d.set("name", found.attributes.get_string("dc").unwrap_or(&name));
        let parent_dn = extract_domain_from_dn(split_dn(&found.dn).1);
        d.set("parent", dn_to_domain(&parent_dn));
        d.set("dn", found.dn);
        Ok(())
    }
}
