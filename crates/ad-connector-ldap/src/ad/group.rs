//! Group requests and membership handling.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use ad_connector::error::{ConnectorError, ConnectorResult};
use ad_connector::operation::{AttributeDelta, AttributeSet, Uid};
use ad_connector::traits::Directory;
use tracing::{debug, info, instrument};

use crate::dn::{normalize_dn, rdn};

/// Attributes fetched when reading a group.
pub const GROUP_ATTRIBUTES: &[&str] = &["cn", "description", "groupType", "member"];

/// Scope of a security group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupScope {
    /// Global security group.
    #[default]
    Global,
    /// Domain-local security group.
    Local,
}

impl GroupScope {
    /// The `groupType` value (security-enabled flag plus scope bit).
    pub fn group_type(self) -> i64 {
        match self {
            GroupScope::Global => -2_147_483_646,
            GroupScope::Local => -2_147_483_644,
        }
    }

    /// Name used in resource configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            GroupScope::Global => "GLOBAL",
            GroupScope::Local => "LOCAL",
        }
    }
}

impl fmt::Display for GroupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupScope {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "GLOBAL" => Ok(GroupScope::Global),
            "LOCAL" => Ok(GroupScope::Local),
            other => Err(ConnectorError::invalid_data(format!(
                "group type must be GLOBAL or LOCAL, got '{other}'"
            ))),
        }
    }
}

/// Default container for groups: `cn=Users,<domain>`.
pub fn default_group_container(domain_dn: &str) -> String {
    format!("cn=Users,{domain_dn}")
}

/// DN of a group inside a container.
pub fn group_dn(name: &str, container: &str) -> String {
    format!("{},{container}", rdn("cn", name))
}

/// Attributes of a new group.
pub fn group_attributes(name: &str, description: &str, scope: GroupScope) -> AttributeSet {
    AttributeSet::new()
        .with("objectClass", vec!["top".to_string(), "group".to_string()])
        .with("sAMAccountName", name)
        .with("groupType", scope.group_type())
        .with_non_empty("description", description)
}

/// Modification adding one member.
pub fn add_member_delta(member_dn: &str) -> AttributeDelta {
    let mut delta = AttributeDelta::new();
    delta.add("member", member_dn);
    delta
}

/// Modification removing one member.
pub fn remove_member_delta(member_dn: &str) -> AttributeDelta {
    let mut delta = AttributeDelta::new();
    delta.remove("member", member_dn);
    delta
}

/// Result of comparing the current and desired member lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Member DNs to add, in desired order.
    pub to_add: Vec<String>,
    /// Member DNs to remove, in current order.
    pub to_remove: Vec<String>,
}

impl MembershipDiff {
    /// Whether any change is needed.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute membership changes. DNs compare case-insensitively.
pub fn compute_membership_diff(current: &[String], desired: &[String]) -> MembershipDiff {
    let current_set: HashSet<String> = current.iter().map(|dn| normalize_dn(dn)).collect();
    let desired_set: HashSet<String> = desired.iter().map(|dn| normalize_dn(dn)).collect();

    let mut seen = HashSet::new();
    let to_add = desired
        .iter()
        .filter(|dn| {
            let key = normalize_dn(dn);
            !current_set.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect();

    let to_remove = current
        .iter()
        .filter(|dn| !desired_set.contains(&normalize_dn(dn)))
        .cloned()
        .collect();

    MembershipDiff { to_add, to_remove }
}

/// Name prefix AD uses instead of `member` once a group holds more values
/// than the server's MaxValRange (1500 by default).
const MEMBER_RANGE_PREFIX: &str = "member;range=";

/// The ranged `member` attribute of an entry and the index of its last
/// value. The index is `None` on the final chunk (`member;range=N-*`).
fn member_range(entry: &AttributeSet) -> Option<(String, Option<usize>)> {
    entry.iter().find_map(|(name, _)| {
        let prefix = name.get(..MEMBER_RANGE_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(MEMBER_RANGE_PREFIX) {
            return None;
        }
        let (_, end) = name[MEMBER_RANGE_PREFIX.len()..].split_once('-')?;
        Some((name.clone(), end.parse().ok()))
    })
}

/// Every member of an already read group entry, fetching the remaining
/// `member;range=` chunks when the server returned only the first one.
#[instrument(skip(directory, entry))]
pub async fn collect_members(
    directory: &dyn Directory,
    group_dn: &str,
    entry: AttributeSet,
) -> ConnectorResult<Vec<String>> {
    let mut entry = entry;
    let mut members: Vec<String> = entry
        .get_strings("member")
        .into_iter()
        .map(str::to_string)
        .collect();

    while let Some((name, end)) = member_range(&entry) {
        let chunk = entry.get_strings(&name);
        let received = chunk.len();
        members.extend(chunk.into_iter().map(str::to_string));

        let Some(end) = end else { break };
        if received == 0 {
            break;
        }

        let next = format!("{MEMBER_RANGE_PREFIX}{}-*", end + 1);
        debug!(group = %group_dn, range = %next, "Fetching next member range");
        match directory.get(group_dn, &[next.as_str()]).await? {
            Some(more) => entry = more,
            None => break,
        }
    }

    Ok(members)
}

/// All members of a group, or `None` when the group does not exist.
pub async fn group_members(
    directory: &dyn Directory,
    group_dn: &str,
) -> ConnectorResult<Option<Vec<String>>> {
    match directory.get(group_dn, &["member"]).await? {
        Some(entry) => collect_members(directory, group_dn, entry).await.map(Some),
        None => Ok(None),
    }
}

/// Whether `member_dn` is listed in the group's `member` attribute.
#[instrument(skip(directory))]
pub async fn is_member(
    directory: &dyn Directory,
    group_dn: &str,
    member_dn: &str,
) -> ConnectorResult<bool> {
    let Some(members) = group_members(directory, group_dn).await? else {
        return Err(ConnectorError::ObjectNotFound {
            identifier: group_dn.to_string(),
        });
    };

    let wanted = normalize_dn(member_dn);
    Ok(members.iter().any(|dn| normalize_dn(dn) == wanted))
}

/// Add a member. An existing membership counts as success.
#[instrument(skip(directory))]
pub async fn add_member(
    directory: &dyn Directory,
    group_dn: &str,
    member_dn: &str,
) -> ConnectorResult<()> {
    match directory
        .update(&Uid::from_dn(group_dn), add_member_delta(member_dn))
        .await
    {
        Ok(_) => {
            info!(group = %group_dn, member = %member_dn, "Member added to group");
            Ok(())
        }
        Err(ConnectorError::ObjectAlreadyExists { .. }) => {
            debug!(group = %group_dn, member = %member_dn, "Already a member");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Remove a member if present.
#[instrument(skip(directory))]
pub async fn remove_member(
    directory: &dyn Directory,
    group_dn: &str,
    member_dn: &str,
) -> ConnectorResult<()> {
    if !is_member(directory, group_dn, member_dn).await? {
        debug!(group = %group_dn, member = %member_dn, "Not a member, nothing to remove");
        return Ok(());
    }

    directory
        .update(&Uid::from_dn(group_dn), remove_member_delta(member_dn))
        .await?;
    info!(group = %group_dn, member = %member_dn, "Member removed from group");
    Ok(())
}
