//! `ad_computer` data source.

use async_trait::async_trait;
use tracing::{debug, instrument};

use ad_connector_ldap::ad::computer::{computer_filter, COMPUTER_ATTRIBUTES};

use super::{find_one, lookup_request, DataSource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::{Attribute, Schema};

pub struct ComputerDataSource;

#[async_trait]
impl DataSource for ComputerDataSource {
    fn type_name(&self) -> &'static str {
        "ad_computer"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("Look up a computer account")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the computer"),
            )
            .with_attribute(
                "parent",
                Attribute::optional_string().with_description("DN of the container to search"),
            )
            .with_attribute(
                "domain",
                Attribute::optional_string().with_description("The domain to search"),
            )
            .with_attribute(
                "dn",
                Attribute::optional_string()
                    .also_computed()
                    .with_description("The distinguished name of the computer"),
            )
            .with_attribute(
                "description",
                Attribute::computed_string().with_description("The description of the computer"),
            )
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let request = lookup_request(d, true, computer_filter(&name), COMPUTER_ATTRIBUTES)?;
        debug!(base = %request.base, "Looking up computer");

        let found = find_one(client, request, "computer", &name).await?;
        d.set_id(found.dn.clone());
        d.set("dn", found.dn);
        d.set(
            "description",
            found.attributes.get_string("description").unwrap_or_default(),
        );
        Ok(())
    }
}
