//! Generic entry modifications: attribute replace, rename and move.

use ad_connector::error::ConnectorResult;
use ad_connector::operation::{AttributeDelta, Uid};
use ad_connector::traits::Directory;
use tracing::{info, instrument};

use crate::dn::split_dn;

/// Modification setting one attribute; an empty value clears it.
pub fn replace_attribute_delta(attribute: &str, value: &str) -> AttributeDelta {
    let mut delta = AttributeDelta::new();
    if value.is_empty() {
        delta.clear_attribute(attribute);
    } else {
        delta.replace(attribute, value);
    }
    delta
}

/// Set one attribute of an entry.
#[instrument(skip(directory))]
pub async fn update_entry(
    directory: &dyn Directory,
    dn: &str,
    attribute: &str,
    value: &str,
) -> ConnectorResult<()> {
    directory
        .update(&Uid::from_dn(dn), replace_attribute_delta(attribute, value))
        .await?;
    info!(dn = %dn, attribute = %attribute, "Entry attribute updated");
    Ok(())
}

/// Give an entry a new RDN under the same parent. Returns the new DN.
#[instrument(skip(directory))]
pub async fn rename_entry(
    directory: &dyn Directory,
    dn: &str,
    new_rdn: &str,
) -> ConnectorResult<String> {
    let uid = directory.rename(&Uid::from_dn(dn), new_rdn, None).await?;
    info!(old_dn = %dn, new_dn = %uid.value(), "Entry renamed");
    Ok(uid.value().to_string())
}

/// Move an entry under a new parent, keeping its RDN. Returns the new DN.
#[instrument(skip(directory))]
pub async fn move_entry(
    directory: &dyn Directory,
    dn: &str,
    new_parent: &str,
) -> ConnectorResult<String> {
    let (current_rdn, _) = split_dn(dn);
    let uid = directory
        .rename(&Uid::from_dn(dn), current_rdn, Some(new_parent))
        .await?;
    info!(old_dn = %dn, new_dn = %uid.value(), "Entry moved");
    Ok(uid.value().to_string())
}

/// DN an entry gets after `rename`, for directories that do not report it.
pub fn renamed_dn(dn: &str, new_rdn: &str, new_parent: Option<&str>) -> String {
    let (_, parent) = split_dn(dn);
    let parent = new_parent.unwrap_or(parent);
    if parent.is_empty() {
        new_rdn.to_string()
    } else {
        format!("{new_rdn},{parent}")
    }
}
