//! `ad_computer`: a computer account. The id is the account's DN.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use ad_connector::operation::{SearchRequest, Uid};
use ad_connector::traits::{CreateOp, DeleteOp};
use ad_connector_ldap::ad::computer::{
    computer_attributes, computer_container, computer_dn, computer_filter, COMPUTER_ATTRIBUTES,
};
use ad_connector_ldap::ad::modify::{move_entry, update_entry};
use ad_connector_ldap::dn::domain_to_dn;

use super::Resource;
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::{Attribute, Schema};

pub struct ComputerResource;

impl ComputerResource {
    fn container(d: &ResourceData) -> String {
        computer_container(&domain_to_dn(&d.get_string("domain")), &d.get_string("orgunit"))
    }
}

#[async_trait]
impl Resource for ComputerResource {
    fn type_name(&self) -> &'static str {
        "ad_computer"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("A computer account")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the computer")
                    .force_new(),
            )
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .with_description("The domain of the computer")
                    .force_new(),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the computer"),
            )
            .with_attribute(
                "orgunit",
                Attribute::optional_string()
                    .with_description("The organizational unit the computer belongs to"),
            )
            .with_attribute(
                "dn",
                Attribute::computed_string().with_description("DN of the computer account"),
            )
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn create(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let dn = computer_dn(
            &name,
            &domain_to_dn(&d.get_string("domain")),
            &d.get_string("orgunit"),
        );
        debug!(dn = %dn, "Adding computer");

        client
            .directory()
            .create(&dn, computer_attributes(&name, &d.get_string("description")))
            .await?;
        info!(dn = %dn, "Computer added");

        d.set_id(dn);
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let request = SearchRequest::new(Self::container(d), computer_filter(&name))
            .with_attributes(COMPUTER_ATTRIBUTES);

        let Some(entry) = client.search_unique(request, "computer", &name).await? else {
            debug!("Computer not found");
            d.clear_id();
            return Ok(());
        };

        let dn = entry.dn().unwrap_or_default().to_string();
        d.set_id(dn.clone());
        d.set("name", entry.get_string("cn").unwrap_or(&name));
        d.set("description", entry.get_string("description").unwrap_or_default());
        d.set("dn", dn);
        Ok(())
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn update(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let mut dn = d.id().to_string();

        if d.has_change("orgunit") {
            let container = Self::container(d);
            dn = move_entry(client.directory(), &dn, &container).await?;
            d.set_id(dn.clone());
        }

        if d.has_change("description") {
            update_entry(
                client.directory(),
                &dn,
                "description",
                &d.get_string("description"),
            )
            .await?;
        }

        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn delete(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        self.read(client, d).await?;
        if d.id().is_empty() {
            debug!("Computer already removed");
            return Ok(());
        }

        client.directory().delete(&Uid::from_dn(d.id())).await?;
        info!(dn = %d.id(), "Computer deleted");
        d.clear_id();
        Ok(())
    }
}
