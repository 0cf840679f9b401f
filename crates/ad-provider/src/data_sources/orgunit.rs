//! `ad_ou` data source.

use async_trait::async_trait;
use tracing::{debug, instrument};

use ad_connector::operation::Filter;
use ad_connector_ldap::ad::orgunit::ORGUNIT_ATTRIBUTES;

use super::{find_one, lookup_request, DataSource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::{Attribute, Schema};

pub struct OrgUnitDataSource;

#[async_trait]
impl DataSource for OrgUnitDataSource {
    fn type_name(&self) -> &'static str {
        "ad_ou"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("Look up an organizational unit")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the organizational unit"),
            )
            .with_attribute(
                "parent",
                Attribute::optional_string().with_description("DN of the container to search"),
            )
            .with_attribute(
                "dn",
                Attribute::optional_string()
                    .also_computed()
                    .with_description("The distinguished name of the organizational unit"),
            )
            .with_attribute(
                "description",
                Attribute::computed_string()
                    .with_description("The description of the organizational unit"),
            )
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let filter = Filter::and(vec![
            Filter::eq("objectClass", "organizationalUnit"),
            Filter::eq("ou", name.as_str()),
        ]);
        let request = lookup_request(d, false, filter, ORGUNIT_ATTRIBUTES)?;
        debug!(base = %request.base, "Looking up organizational unit");

        let found = find_one(client, request, "organizational unit", &name).await?;
        d.set(
            "description",
            found.attributes.get_string("description").unwrap_or_default(),
        );
        d.set("dn", found.dn.clone());
        d.set_id(found.guid);
        Ok(())
    }
}
