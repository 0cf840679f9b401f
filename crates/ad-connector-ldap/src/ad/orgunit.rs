//! Organizational unit requests.

use ad_connector::operation::AttributeSet;

use crate::dn::rdn;

/// Attributes fetched when reading an organizational unit.
pub const ORGUNIT_ATTRIBUTES: &[&str] = &["ou", "description"];

/// DN of an organizational unit under `parent`.
pub fn orgunit_dn(name: &str, parent: &str) -> String {
    format!("{},{parent}", rdn("ou", name))
}

/// Attributes of a new organizational unit.
pub fn orgunit_attributes(name: &str, description: &str) -> AttributeSet {
    AttributeSet::new()
        .with(
            "objectClass",
            vec!["top".to_string(), "organizationalUnit".to_string()],
        )
        .with("ou", name)
        .with_non_empty("description", description)
}
