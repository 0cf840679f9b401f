//! `ad_user`: a user account, identified by objectGUID.
//!
//! Creating a user is three directory calls: add the disabled account, set
//! its password, enable it. Passwords can only be written over SSL.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use ad_connector::operation::{Filter, Uid};
use ad_connector::traits::{CreateOp, DeleteOp, UpdateOp};
use ad_connector_ldap::ad::modify::{move_entry, update_entry};
use ad_connector_ldap::ad::password::{build_password_modify, validate_password_connection};
use ad_connector_ldap::ad::user::{
    activation_delta, default_user_container, user_dn, UserSpec, USER_ATTRIBUTES,
};
use ad_connector_ldap::dn::{dn_eq, domain_to_dn, split_dn};

use super::{identity_request, reconcile_dn, Resource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::{ProviderError, ProviderResult};
use crate::schema::{Attribute, Schema};

pub struct UserResource;

impl UserResource {
    fn container(d: &ResourceData) -> String {
        let parent = d.get_string("parent");
        if parent.is_empty() {
            default_user_container(&domain_to_dn(&d.get_string("domain")))
        } else {
            parent
        }
    }

    fn spec(d: &ResourceData) -> UserSpec {
        UserSpec {
            username: d.get_string("username"),
            firstname: d.get_string("firstname"),
            lastname: d.get_string("lastname"),
            description: d.get_string("description"),
        }
    }

    async fn set_password(client: &AdClient, dn: &str, password: &str) -> ProviderResult<()> {
        let delta = build_password_modify(password, client.use_ssl())?;
        client.directory().update(&Uid::from_dn(dn), delta).await?;
        info!(dn = %dn, "Password set");
        Ok(())
    }
}

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &'static str {
        "ad_user"
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .with_description("A user account")
            .with_attribute(
                "username",
                Attribute::required_string()
                    .with_description("The sAMAccountName of the user")
                    .force_new(),
            )
            .with_attribute(
                "password",
                Attribute::required_string()
                    .with_description("The password of the user")
                    .sensitive(),
            )
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .with_description("The domain of the user")
                    .force_new(),
            )
            .with_attribute(
                "firstname",
                Attribute::required_string()
                    .with_description("The first name of the user")
                    .force_new(),
            )
            .with_attribute(
                "lastname",
                Attribute::required_string()
                    .with_description("The last name of the user")
                    .force_new(),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("The description of the user"),
            )
            .with_attribute(
                "parent",
                Attribute::optional_string()
                    .with_description("DN of the container the user belongs to"),
            )
            .with_attribute(
                "dn",
                Attribute::computed_string().with_description("The distinguished name of the user"),
            )
    }

    #[instrument(skip(self, client, d), fields(username = %d.get_string("username")))]
    async fn create(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        validate_password_connection(client.use_ssl())?;

        let spec = Self::spec(d);
        let dn = user_dn(&spec.full_name(), &Self::container(d));
        debug!(dn = %dn, "Adding user");

        let directory = client.directory();
        directory.create(&dn, spec.attributes()).await?;
        info!(dn = %dn, "User added");

        let password = d.get_string("password");
        let enable = async {
            Self::set_password(client, &dn, &password).await?;
            directory
                .update(&Uid::from_dn(dn.as_str()), activation_delta())
                .await?;
            Ok::<(), ProviderError>(())
        };
        if let Err(e) = enable.await {
            warn!(dn = %dn, error = %e, "Removing half-created user");
            if let Err(cleanup) = directory.delete(&Uid::from_dn(dn.as_str())).await {
                warn!(dn = %dn, error = %cleanup, "Could not remove half-created user");
            }
            return Err(e);
        }
        info!(dn = %dn, "User activated");

        d.set("dn", dn);
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let username = d.get_string("username");
        let request = identity_request(
            "user",
            d,
            Filter::eq("sAMAccountName", username.as_str()),
            USER_ATTRIBUTES,
        );

        let Some(found) = client.find_object(request, "user", &username).await? else {
            debug!(username = %username, "User not found");
            d.clear_id();
            return Ok(());
        };

        let entry = &found.attributes;
        d.set_id(found.guid.clone());
        d.set("dn", reconcile_dn(&d.get_string("dn"), &found.dn));

        // An unset parent stays unset while the user is in the default container.
        let container = split_dn(&found.dn).1;
        if !dn_eq(container, &Self::container(d)) || !d.get_string("parent").is_empty() {
            d.set("parent", reconcile_dn(&d.get_string("parent"), container));
        }
        for (attribute, key) in [
            ("sAMAccountName", "username"),
            ("givenName", "firstname"),
            ("sn", "lastname"),
        ] {
            if let Some(value) = entry.get_string(attribute) {
                d.set(key, value);
            }
        }
        d.set("description", entry.get_string("description").unwrap_or_default());
        Ok(())
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn update(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let directory = client.directory();
        let mut dn = d.get_string("dn");

        if d.has_change("parent") {
            let container = Self::container(d);
            if !dn_eq(split_dn(&dn).1, &container) {
                dn = move_entry(directory, &dn, &container).await?;
            }
        }

        if d.has_change("description") {
            update_entry(directory, &dn, "description", &d.get_string("description")).await?;
        }

        if d.has_change("password") {
            Self::set_password(client, &dn, &d.get_string("password")).await?;
        }

        d.set("dn", dn);
        self.read(client, d).await
    }

    #[instrument(skip(self, client, d), fields(id = %d.id()))]
    async fn delete(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        self.read(client, d).await?;
        if d.id().is_empty() {
            debug!("User already removed");
            return Ok(());
        }

        let dn = d.get_string("dn");
        client.directory().delete(&Uid::from_dn(dn.as_str())).await?;
        info!(dn = %dn, "User deleted");
        d.clear_id();
        Ok(())
    }
}
