//! `ad_group` data source.

use async_trait::async_trait;
use tracing::{debug, instrument};

use ad_connector::error::ConnectorError;
use ad_connector::operation::Filter;
use ad_connector_ldap::ad::group::{collect_members, GroupScope, GROUP_ATTRIBUTES};

use super::{find_one, lookup_request, DataSource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::{ProviderError, ProviderResult};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct GroupDataSource;

#[async_trait]
impl DataSource for GroupDataSource {
    fn type_name(&self) -> &'static str {
        "ad_group"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("Look up a security group")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the group"),
            )
            .with_attribute(
                "parent",
                Attribute::optional_string().with_description("DN of the container to search"),
            )
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .also_computed()
                    .with_description("GLOBAL or LOCAL; matches either when unset"),
            )
            .with_attribute(
                "dn",
                Attribute::optional_string()
                    .also_computed()
                    .with_description("The distinguished name of the group"),
            )
            .with_attribute(
                "description",
                Attribute::computed_string().with_description("The description of the group"),
            )
            .with_attribute(
                "members",
                Attribute::computed(AttributeType::StringSet)
                    .with_description("DNs of the group members"),
            )
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let mut filter = Filter::and(vec![
            Filter::eq("objectClass", "group"),
            Filter::eq("cn", name.as_str()),
        ]);

        let group_type = d.get_string("type");
        if !group_type.is_empty() {
            let scope: GroupScope = group_type.parse().map_err(|e: ConnectorError| {
                ProviderError::invalid_attribute("type", e.to_string())
            })?;
            filter = filter.and_with(Filter::eq("groupType", scope.group_type().to_string()));
        }

        let request = lookup_request(d, false, filter, GROUP_ATTRIBUTES)?;
        debug!(base = %request.base, "Looking up group");

        let found = find_one(client, request, "group", &name).await?;
        let entry = &found.attributes;

        let scope = entry
            .get("groupType")
            .and_then(|v| v.as_integer())
            .and_then(|t| {
                [GroupScope::Global, GroupScope::Local]
                    .into_iter()
                    .find(|s| s.group_type() == t)
            });
        if let Some(scope) = scope {
            d.set("type", scope.as_str());
        }

        d.set(
            "description",
            entry.get_string("description").unwrap_or_default(),
        );
        let members =
            collect_members(client.directory(), &found.dn, found.attributes.clone()).await?;
        d.set("members", members);
        d.set("dn", found.dn.clone());
        d.set_id(found.guid);
        Ok(())
    }
}
