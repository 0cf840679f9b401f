//! Computer account requests.

use ad_connector::operation::{AttributeSet, Filter};

use crate::dn::rdn;

/// `WORKSTATION_TRUST_ACCOUNT` flag of userAccountControl.
pub const WORKSTATION_TRUST_ACCOUNT: i64 = 0x1000;

/// Attributes fetched when reading a computer.
pub const COMPUTER_ATTRIBUTES: &[&str] = &["cn", "description"];

/// Container for computer accounts.
///
/// `ou=Computers,ou=<orgunit>,<domain>` when an orgunit name is given,
/// otherwise the built-in `cn=Computers,<domain>`.
pub fn computer_container(domain_dn: &str, orgunit: &str) -> String {
    if orgunit.is_empty() {
        format!("cn=Computers,{domain_dn}")
    } else {
        format!("ou=Computers,{},{domain_dn}", rdn("ou", orgunit))
    }
}

/// DN of a computer account.
pub fn computer_dn(name: &str, domain_dn: &str, orgunit: &str) -> String {
    format!("{},{}", rdn("cn", name), computer_container(domain_dn, orgunit))
}

/// Attributes of a new computer account.
pub fn computer_attributes(name: &str, description: &str) -> AttributeSet {
    AttributeSet::new()
        .with("objectClass", vec!["top".to_string(), "computer".to_string()])
        .with("cn", name)
        .with("sAMAccountName", format!("{}$", name.to_uppercase()))
        .with("userAccountControl", WORKSTATION_TRUST_ACCOUNT)
        .with_non_empty("description", description)
}

/// `(&(objectClass=computer)(cn=<name>))`.
pub fn computer_filter(name: &str) -> Filter {
    Filter::and(vec![
        Filter::eq("objectClass", "computer"),
        Filter::eq("cn", name),
    ])
}
