//! `ad_ou`: an organizational unit, identified by objectGUID.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use ad_connector::operation::{Filter, Uid};
use ad_connector::traits::{CreateOp, DeleteOp};
use ad_connector_ldap::ad::modify::{move_entry, rename_entry, update_entry};
use ad_connector_ldap::ad::orgunit::{orgunit_attributes, orgunit_dn, ORGUNIT_ATTRIBUTES};
use ad_connector_ldap::dn::{dn_eq, domain_to_dn, rdn, split_dn};

use super::{identity_request, reconcile_dn, Resource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::{Attribute, Schema};

pub struct OrgUnitResource;

impl OrgUnitResource {
    fn parent(d: &ResourceData) -> String {
        let parent = d.get_string("parent");
        if parent.is_empty() {
            domain_to_dn(&d.get_string("domain"))
        } else {
            parent
        }
    }

    fn dn(d: &ResourceData) -> String {
        let dn = d.get_string("dn");
        if dn.is_empty() {
            orgunit_dn(&d.get_string("name"), &Self::parent(d))
        } else {
            dn
        }
    }
}

#[async_trait]
impl Resource for OrgUnitResource {
    fn type_name(&self) -> &'static str {
        "ad_ou"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("An organizational unit")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the organizational unit"),
            )
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .with_description("The domain of the organizational unit")
                    .force_new(),
            )
            .with_attribute(
                "description",
                Attribute::optional_string()
                    .with_description("The description of the organizational unit"),
            )
            .with_attribute(
                "parent",
                Attribute::optional_string()
                    .with_description("DN of the parent container, the domain root when unset"),
            )
            .with_attribute(
                "dn",
                Attribute::computed_string()
                    .with_description("The distinguished name of the organizational unit"),
            )
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn create(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let dn = orgunit_dn(&name, &Self::parent(d));
        debug!(dn = %dn, "Adding organizational unit");

        client
            .directory()
            .create(&dn, orgunit_attributes(&name, &d.get_string("description")))
            .await?;
        info!(dn = %dn, "Organizational unit added");

        d.set("dn", dn);
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let dn = Self::dn(d);
        let name = d.get_string("name");
        let request = identity_request(
            "organizationalUnit",
            d,
            Filter::eq("distinguishedName", dn.as_str()),
            ORGUNIT_ATTRIBUTES,
        );

        let Some(found) = client
            .find_object(request, "organizational unit", &name)
            .await?
        else {
            debug!(dn = %dn, "Organizational unit not found");
            d.clear_id();
            return Ok(());
        };

        let entry = &found.attributes;
        d.set_id(found.guid.clone());
        d.set("dn", reconcile_dn(&dn, &found.dn));
        if let Some(ou) = entry.get_string("ou") {
            d.set("name", ou);
        }
        d.set("description", entry.get_string("description").unwrap_or_default());
        Ok(())
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn update(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let directory = client.directory();
        let mut dn = Self::dn(d);

        if d.has_change("name") {
            dn = rename_entry(directory, &dn, &rdn("ou", &d.get_string("name"))).await?;
        }

        if d.has_change("parent") {
            let parent = Self::parent(d);
            if !dn_eq(split_dn(&dn).1, &parent) {
                dn = move_entry(directory, &dn, &parent).await?;
            }
        }

        if d.has_change("description") {
            update_entry(directory, &dn, "description", &d.get_string("description")).await?;
        }

        d.set("dn", dn);
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn delete(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        self.read(client, d).await?;
        if d.id().is_empty() {
            debug!("Organizational unit already removed");
            return Ok(());
        }

        let dn = d.get_string("dn");
        client.directory().delete(&Uid::from_dn(dn.as_str())).await?;
        info!(dn = %dn, "Organizational unit deleted");
        d.clear_id();
        Ok(())
    }
}
