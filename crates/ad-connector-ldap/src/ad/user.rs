//! User account requests.

use ad_connector::operation::{AttributeDelta, AttributeSet, Filter};

use crate::dn::rdn;

/// `NORMAL_ACCOUNT` flag of userAccountControl.
pub const NORMAL_ACCOUNT: i64 = 0x200;

/// Attributes fetched when reading a user.
pub const USER_ATTRIBUTES: &[&str] = &[
    "cn",
    "displayName",
    "givenName",
    "sn",
    "sAMAccountName",
    "description",
    "memberOf",
    "userAccountControl",
];

/// Desired state of a user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub description: String,
}

impl UserSpec {
    /// `first last`, used as cn, displayName and name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }

    /// Attributes of the new account. The account starts disabled until a
    /// password is set and it is activated.
    pub fn attributes(&self) -> AttributeSet {
        let full_name = self.full_name();
        AttributeSet::new()
            .with(
                "objectClass",
                vec![
                    "top".to_string(),
                    "person".to_string(),
                    "organizationalPerson".to_string(),
                    "user".to_string(),
                ],
            )
            .with("cn", full_name.as_str())
            .with("displayName", full_name.as_str())
            .with("name", full_name.as_str())
            .with("givenName", self.firstname.as_str())
            .with("sn", self.lastname.as_str())
            .with("sAMAccountName", self.username.as_str())
            .with("instanceType", 4i64)
            .with_non_empty("description", &self.description)
    }
}

/// Default container for users: `cn=Users,<domain>`.
pub fn default_user_container(domain_dn: &str) -> String {
    format!("cn=Users,{domain_dn}")
}

/// DN of a user inside a container, named by full name.
pub fn user_dn(full_name: &str, container: &str) -> String {
    format!("{},{container}", rdn("cn", full_name))
}

/// `(&(objectClass=user)(sAMAccountName=<username>))`.
pub fn user_filter(username: &str) -> Filter {
    Filter::and(vec![
        Filter::eq("objectClass", "user"),
        Filter::eq("sAMAccountName", username),
    ])
}

/// Modification enabling a normal account.
pub fn activation_delta() -> AttributeDelta {
    let mut delta = AttributeDelta::new();
    delta.replace("userAccountControl", NORMAL_ACCOUNT);
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> UserSpec {
        UserSpec {
            username: "jdoe".to_string(),
            firstname: "John".to_string(),
            lastname: "Doe".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_user_attributes() {
        let attrs = spec().attributes();
        assert_eq!(attrs.get_string("cn"), Some("John Doe"));
        assert_eq!(attrs.get_string("displayName"), Some("John Doe"));
        assert_eq!(attrs.get_string("name"), Some("John Doe"));
        assert_eq!(attrs.get_string("givenName"), Some("John"));
        assert_eq!(attrs.get_string("sn"), Some("Doe"));
        assert_eq!(attrs.get_string("sAMAccountName"), Some("jdoe"));
        assert_eq!(attrs.get("instanceType").and_then(|v| v.as_integer()), Some(4));
        assert!(!attrs.has("description"));
        assert!(attrs.get_strings("objectClass").contains(&"user"));
    }

    #[test]
    fn test_user_dn() {
        let container = default_user_container("dc=example,dc=com");
        assert_eq!(
            user_dn(&spec().full_name(), &container),
            "cn=John Doe,cn=Users,dc=example,dc=com"
        );
    }

    #[test]
    fn test_activation_delta() {
        let delta = activation_delta();
        assert_eq!(
            delta.replace.get("userAccountControl").and_then(|v| v.as_integer()),
            Some(512)
        );
    }
}
