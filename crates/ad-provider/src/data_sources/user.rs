//! `ad_user` data source.

use async_trait::async_trait;
use tracing::{debug, instrument};

use ad_connector::operation::SearchRequest;
use ad_connector_ldap::ad::user::{user_filter, USER_ATTRIBUTES};

use super::{find_one, DataSource};
use crate::client::AdClient;
use crate::data::ResourceData;
use crate::error::ProviderResult;
use crate::schema::{Attribute, AttributeType, Schema};

pub struct UserDataSource;

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &'static str {
        "ad_user"
    }

    fn schema(&self) -> Schema {
        let computed = |description: &str| Attribute::computed_string().with_description(description);

        Schema::new()
            .with_description("Look up a user account")
            .with_attribute(
                "username",
                Attribute::required_string().with_description("The sAMAccountName of the user"),
            )
            .with_attribute(
                "parent",
                Attribute::required_string().with_description("DN of the container to search"),
            )
            .with_attribute("firstname", computed("The first name of the user"))
            .with_attribute("lastname", computed("The last name of the user"))
            .with_attribute("name", computed("The display name of the user"))
            .with_attribute("description", computed("The description of the user"))
            .with_attribute("dn", computed("The distinguished name of the user"))
            .with_attribute(
                "groups",
                Attribute::computed(AttributeType::StringSet)
                    .with_description("DNs of the groups the user belongs to"),
            )
    }

    #[instrument(skip(self, client, d), fields(username = %d.get_string("username")))]
    async fn read(&self, client: &AdClient, d: &mut ResourceData) -> ProviderResult<()> {
        let username = d.get_string("username");
        let parent = d.get_string("parent");
        debug!(base = %parent, "Looking up user");

        let request = SearchRequest::new(parent, user_filter(&username))
            .with_attributes(USER_ATTRIBUTES);
        let found = find_one(client, request, "user", &username).await?;
        let entry = &found.attributes;

        for (attribute, key) in [
            ("givenName", "firstname"),
            ("sn", "lastname"),
            ("displayName", "name"),
            ("description", "description"),
        ] {
            d.set(key, entry.get_string(attribute).unwrap_or_default());
        }
        d.set("groups", entry.get_strings("memberOf"));
        d.set("dn", found.dn.clone());
        d.set_id(found.guid);
        Ok(())
    }
}
