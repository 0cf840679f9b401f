//! `ad_group`: a security group, identified by objectGUID.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use ad_connector::error::ConnectorError;
use ad_connector::operation::{Filter, Uid};
use ad_connector::traits::{CreateOp, DeleteOp};
use ad_connector_ldap::ad::group::{
    add_member, collect_members, compute_membership_diff, default_group_container,
    group_attributes, group_dn, group_members, remove_member, GroupScope, GROUP_ATTRIBUTES,
};
use ad_connector_ldap::ad::modify::{move_entry, rename_entry, update_entry};
use ad_connector_ldap::dn::{dn_eq, domain_to_dn, parse_dn, rdn, split_dn};

use super::{identity_request, reconcile_dn, reconcile_dns, Resource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::{ProviderError, ProviderResult};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct GroupResource;

impl GroupResource {
    fn container(d: &ResourceData) -> String {
        let orgunit = d.get_string("orgunit");
        if orgunit.is_empty() {
            default_group_container(&domain_to_dn(&d.get_string("domain")))
        } else {
            orgunit
        }
    }

    fn scope(d: &ResourceData) -> ProviderResult<GroupScope> {
        d.get_string("type")
            .parse()
            .map_err(|e: ConnectorError| {
                ProviderError::invalid_attribute("type", e.to_string())
            })
    }

    /// Known DN of the group, or the DN it is created at.
    fn dn(d: &ResourceData) -> String {
        let dn = d.get_string("dn");
        if dn.is_empty() {
            group_dn(&d.get_string("name"), &Self::container(d))
        } else {
            dn
        }
    }
}

#[async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &'static str {
        "ad_group"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("A security group")
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the group"),
            )
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .with_description("The domain of the group")
                    .force_new(),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the group"),
            )
            .with_attribute(
                "orgunit",
                Attribute::optional_string()
                    .with_description("DN of the container the group belongs to"),
            )
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_description(
                        "The type of the group. Could be either GLOBAL or LOCAL. Defaults to GLOBAL.",
                    )
                    .with_default(GroupScope::Global.as_str())
                    .force_new(),
            )
            .with_attribute(
                "members",
                Attribute::optional(AttributeType::StringSet)
                    .with_description("DNs of the group members"),
            )
            .with_attribute(
                "dn",
                Attribute::computed_string().with_description("The distinguished name of the group"),
            )
    }

    #[instrument(skip(self, client, d), fields(name = %d.get_string("name")))]
    async fn create(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let name = d.get_string("name");
        let scope = Self::scope(d)?;
        let dn = group_dn(&name, &Self::container(d));
        debug!(dn = %dn, scope = %scope, "Adding group");

        client
            .directory()
            .create(
                &dn,
                group_attributes(&name, &d.get_string("description"), scope),
            )
            .await?;
        info!(dn = %dn, "Group added");

        for member in d.get_set("members") {
            if let Err(e) = add_member(client.directory(), &dn, &member).await {
                warn!(dn = %dn, member = %member, error = %e, "Removing half-created group");
                if let Err(cleanup) = client.directory().delete(&Uid::from_dn(dn.as_str())).await {
                    warn!(dn = %dn, error = %cleanup, "Could not remove half-created group");
                }
                return Err(e.into());
            }
        }

        d.set("dn", dn);
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let dn = Self::dn(d);
        let (name, _) = parse_dn(&dn, "cn");
        let request = identity_request(
            "group",
            d,
            Filter::eq("distinguishedName", dn.as_str()),
            GROUP_ATTRIBUTES,
        );

        let Some(found) = client.find_object(request, "group", &name).await? else {
            debug!(dn = %dn, "Group not found");
            d.clear_id();
            return Ok(());
        };

        let entry = &found.attributes;
        d.set_id(found.guid.clone());
        d.set("dn", reconcile_dn(&dn, &found.dn));
        if let Some(cn) = entry.get_string("cn") {
            d.set("name", cn);
        }
        d.set("description", entry.get_string("description").unwrap_or_default());

        if let Some(group_type) = entry.get("groupType").and_then(|v| v.as_integer()) {
            let actual = match group_type {
                t if t == GroupScope::Local.group_type() => Some(GroupScope::Local),
                t if t == GroupScope::Global.group_type() => Some(GroupScope::Global),
                _ => None,
            };
            if let Some(actual) = actual {
                if Self::scope(d).ok() != Some(actual) {
                    d.set("type", actual.as_str());
                }
            }
        }

        if d.is_set("members") {
            let configured = d.get_set("members");
            let actual =
                collect_members(client.directory(), &found.dn, found.attributes.clone()).await?;
            let actual: Vec<&str> = actual.iter().map(String::as_str).collect();
            d.set("members", reconcile_dns(&configured, &actual));
        }
        Ok(())
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn update(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let directory = client.directory();
        let mut dn = Self::dn(d);

        if d.has_change("name") {
            let name = d.get_string("name");
            dn = rename_entry(directory, &dn, &rdn("cn", &name)).await?;
            update_entry(directory, &dn, "sAMAccountName", &name).await?;
        }

        if d.has_change("orgunit") {
            let container = Self::container(d);
            if !dn_eq(split_dn(&dn).1, &container) {
                dn = move_entry(directory, &dn, &container).await?;
            }
        }

        if d.has_change("description") {
            update_entry(directory, &dn, "description", &d.get_string("description")).await?;
        }

        if d.has_change("members") {
            let current = match group_members(directory, &dn).await? {
                Some(members) => members,
                None => {
                    warn!(dn = %dn, "Group vanished during update");
                    Vec::new()
                }
            };
            let diff = compute_membership_diff(&current, &d.get_set("members"));
            for member in &diff.to_remove {
                remove_member(directory, &dn, member).await?;
            }
            for member in &diff.to_add {
                add_member(directory, &dn, member).await?;
            }
        }

        d.set("dn", dn);
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn delete(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        self.read(client, d).await?;
        if d.id().is_empty() {
            debug!("Group already removed");
            return Ok(());
        }

        let dn = d.get_string("dn");
        client.directory().delete(&Uid::from_dn(dn.as_str())).await?;
        info!(dn = %dn, "Group deleted");
        d.clear_id();
        Ok(())
    }
}
