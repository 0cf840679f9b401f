//! `ad_user_attachment`: membership of one user in one group.

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use ad_connector::error::ConnectorError;
use ad_connector_ldap::ad::group::{add_member, is_member, remove_member};

use super::Resource;
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::{Attribute, Schema};

pub struct UserAttachmentResource;

#[async_trait]
impl Resource for UserAttachmentResource {
    fn type_name(&self) -> &'static str {
        "ad_user_attachment"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("Membership of a user in a group")
            .with_attribute(
                "group_dn",
                Attribute::required_string()
                    .with_description("The dn of the group to add the user to")
                    .force_new(),
            )
            .with_attribute(
                "user_dn",
                Attribute::required_string()
                    .with_description("The dn of the user to attach to the group")
                    .force_new(),
            )
            .with_attribute(
                "name",
                Attribute::optional_string().with_description("A label for the attachment"),
            )
    }

    #[instrument(skip(self, client, d))]
    async fn create(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let group_dn = d.get_string("group_dn");
        let user_dn = d.get_string("user_dn");

        add_member(client.directory(), &group_dn, &user_dn).await?;

        d.set_id(Uuid::new_v4().to_string());
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let group_dn = d.get_string("group_dn");
        let user_dn = d.get_string("user_dn");

        let attached = match is_member(client.directory(), &group_dn, &user_dn).await {
            Ok(attached) => attached,
            Err(ConnectorError::ObjectNotFound { .. }) => false,
            Err(e) => return Err(e.into()),
        };

        if !attached {
            debug!(group = %group_dn, user = %user_dn, "Attachment not found");
            d.clear_id();
        }
        Ok(())
    }

    async fn update(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn delete(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let group_dn = d.get_string("group_dn");
        let user_dn = d.get_string("user_dn");

        match remove_member(client.directory(), &group_dn, &user_dn).await {
            Ok(()) => info!(group = %group_dn, user = %user_dn, "User detached"),
            Err(ConnectorError::ObjectNotFound { .. }) => {
                debug!(group = %group_dn, "Group already removed");
            }
            Err(e) => return Err(e.into()),
        }

        d.clear_id();
        Ok(())
    }
}
