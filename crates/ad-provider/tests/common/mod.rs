//! Common test utilities for ad-provider integration tests.
//!
//! [`MemoryDirectory`] keeps entries in memory and behaves like a domain
//! controller where the provider can observe it: objectGUIDs and extended
//! DNs, base/one-level/subtree scopes, missing search bases, duplicate
//! members and computed `memberOf` backlinks.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ad_connector::async_trait;
use ad_connector::prelude::*;
use ad_connector_ldap::dn::{dn_eq, normalize_dn, object_guid_query, split_dn};
use ad_provider::AdProvider;

/// Root of the seeded domain.
pub const DOMAIN_DN: &str = "dc=example,dc=com";
pub const USERS_DN: &str = "cn=Users,dc=example,dc=com";
pub const COMPUTERS_DN: &str = "cn=Computers,dc=example,dc=com";

#[derive(Debug, Clone)]
struct Entry {
    dn: String,
    guid: String,
    attributes: Vec<(String, Vec<String>)>,
}

impl Entry {
    fn values(&self, name: &str) -> Option<&Vec<String>> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    fn values_mut(&mut self, name: &str) -> &mut Vec<String> {
        let index = match self
            .attributes
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(index) => index,
            None => {
                self.attributes.push((name.to_string(), Vec::new()));
                self.attributes.len() - 1
            }
        };
        &mut self.attributes[index].1
    }

    fn set(&mut self, name: &str, values: Vec<String>) {
        self.attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        if !values.is_empty() {
            self.attributes.push((name.to_string(), values));
        }
    }

    fn has_value(&self, name: &str, value: &str) -> bool {
        self.values(name)
            .is_some_and(|vs| vs.iter().any(|v| v.eq_ignore_ascii_case(value)))
    }

    fn is_under(&self, base: &str) -> bool {
        let dn = normalize_dn(&self.dn);
        let base = normalize_dn(base);
        dn == base || dn.ends_with(&format!(",{base}"))
    }
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    next_guid: u128,
    operations: Vec<String>,
    /// Largest `member` chunk returned before switching to ranged retrieval.
    member_page: Option<usize>,
}

impl State {
    fn position(&self, dn: &str) -> Option<usize> {
        self.entries.iter().position(|e| dn_eq(&e.dn, dn))
    }

    fn insert(&mut self, dn: &str, attributes: Vec<(String, Vec<String>)>) -> String {
        self.next_guid += 1;
        let guid = format!("{:032x}", 0xa1b2_c3d4_0000_0000_0000_0000_0000_0000u128 + self.next_guid);
        let mut entry = Entry {
            dn: dn.to_string(),
            guid: guid.clone(),
            attributes,
        };

        let (rdn, _) = split_dn(dn);
        if let Some((attribute, value)) = rdn.split_once('=') {
            if entry.values(attribute).is_none() {
                entry.set(attribute, vec![value.to_string()]);
            }
        }

        self.entries.push(entry);
        guid
    }

    /// `memberOf` is maintained by the directory, not stored.
    fn member_of(&self, dn: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| {
                e.values("member")
                    .is_some_and(|members| members.iter().any(|m| dn_eq(m, dn)))
            })
            .map(|e| e.dn.clone())
            .collect()
    }

    fn matches(&self, entry: &Entry, filter: &Filter) -> bool {
        match filter {
            Filter::Equals { attribute, value } => {
                if attribute.eq_ignore_ascii_case("distinguishedName") {
                    dn_eq(&entry.dn, value)
                } else if attribute.eq_ignore_ascii_case("memberOf") {
                    self.member_of(&entry.dn).iter().any(|g| dn_eq(g, value))
                } else {
                    entry.has_value(attribute, value)
                }
            }
            Filter::EqualsEscaped { attribute, value } => {
                if attribute.eq_ignore_ascii_case("objectGUID") {
                    object_guid_query(&entry.guid).eq_ignore_ascii_case(value)
                } else {
                    entry.has_value(attribute, value)
                }
            }
            Filter::Present { attribute } => {
                attribute.eq_ignore_ascii_case("objectClass") || entry.values(attribute).is_some()
            }
            Filter::And { filters } => filters.iter().all(|f| self.matches(entry, f)),
        }
    }

    fn to_attribute_set(&self, entry: &Entry, request: &SearchRequest) -> AttributeSet {
        let dn = if request.extended_dn {
            format!(
                "<GUID={}>;<SID=S-1-5-21-1004336348-1177238915-{}>;{}",
                entry.guid,
                &entry.guid[28..],
                entry.dn
            )
        } else {
            entry.dn.clone()
        };

        let all = request.attributes.is_empty() || request.attributes.iter().any(|a| a == "*");
        let wanted = |name: &str| all || request.attributes.iter().any(|a| a.eq_ignore_ascii_case(name));

        let mut set = AttributeSet::new().with("dn", dn);
        for (name, values) in &entry.attributes {
            if name.eq_ignore_ascii_case("member") {
                if let Some(page) = self.member_page.filter(|page| values.len() > *page) {
                    let start = requested_range_start(request)
                        .or_else(|| wanted("member").then_some(0));
                    if let Some(start) = start {
                        let chunk: Vec<String> =
                            values.iter().skip(start).take(page).cloned().collect();
                        let end = if start + page >= values.len() {
                            "*".to_string()
                        } else {
                            (start + page - 1).to_string()
                        };
                        set.set(format!("member;range={start}-{end}"), to_value(chunk));
                    }
                    continue;
                }
            }
            if wanted(name) {
                set.set(name.clone(), to_value(values.clone()));
            }
        }

        let member_of = self.member_of(&entry.dn);
        if wanted("memberOf") && !member_of.is_empty() {
            set.set("memberOf", to_value(member_of));
        }
        set
    }
}

/// Start index of a `member;range=N-*` attribute request.
fn requested_range_start(request: &SearchRequest) -> Option<usize> {
    request.attributes.iter().find_map(|a| {
        a.to_ascii_lowercase()
            .strip_prefix("member;range=")?
            .strip_suffix("-*")?
            .parse()
            .ok()
    })
}

fn to_value(mut values: Vec<String>) -> AttributeValue {
    if values.len() == 1 {
        AttributeValue::String(values.remove(0))
    } else {
        AttributeValue::from(values)
    }
}

fn to_strings(value: &AttributeValue) -> Vec<String> {
    value
        .to_octets()
        .into_iter()
        .map(|octets| String::from_utf8_lossy(&octets).into_owned())
        .collect()
}

/// In-memory directory seeded with `example.com`.
pub struct MemoryDirectory {
    state: Mutex<State>,
}

impl MemoryDirectory {
    /// Directory holding the domain root and the built-in containers.
    pub fn new() -> Self {
        let directory = Self {
            state: Mutex::new(State::default()),
        };
        directory.seed(DOMAIN_DN, &[("objectClass", &["top", "domain"])]);
        directory.seed(USERS_DN, &[("objectClass", &["top", "container"])]);
        directory.seed(COMPUTERS_DN, &[("objectClass", &["top", "container"])]);
        directory
    }

    /// Insert an entry directly and return its GUID.
    pub fn seed(&self, dn: &str, attributes: &[(&str, &[&str])]) -> String {
        let attributes = attributes
            .iter()
            .map(|(name, values)| {
                (
                    (*name).to_string(),
                    values.iter().map(|v| (*v).to_string()).collect(),
                )
            })
            .collect();
        self.state.lock().unwrap().insert(dn, attributes)
    }

    /// Seed a user account under `parent`.
    pub fn seed_user(&self, username: &str, first: &str, last: &str, parent: &str) -> String {
        let display = format!("{first} {last}");
        let dn = format!("cn={display},{parent}");
        self.seed(
            &dn,
            &[
                ("objectClass", &["top", "person", "organizationalPerson", "user"]),
                ("sAMAccountName", &[username]),
                ("givenName", &[first]),
                ("sn", &[last]),
                ("displayName", &[display.as_str()]),
            ],
        );
        dn
    }

    /// Return at most `page` member values per read, as AD does past its
    /// MaxValRange.
    pub fn page_members(&self, page: usize) {
        self.state.lock().unwrap().member_page = Some(page);
    }

    pub fn exists(&self, dn: &str) -> bool {
        self.state.lock().unwrap().position(dn).is_some()
    }

    /// Stored values of an attribute (empty when absent).
    pub fn values(&self, dn: &str, attribute: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .position(dn)
            .and_then(|i| state.entries[i].values(attribute).cloned())
            .unwrap_or_default()
    }

    pub fn guid(&self, dn: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.position(dn).map(|i| state.entries[i].guid.clone())
    }

    /// Delete an entry behind the provider's back.
    pub fn remove(&self, dn: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(i) = state.position(dn) {
            state.entries.remove(i);
        }
    }

    /// Log of write operations, e.g. `add cn=x,dc=example,dc=com`.
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }
}

#[async_trait]
impl Connector for MemoryDirectory {
    fn display_name(&self) -> &str {
        "memory"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CreateOp for MemoryDirectory {
    async fn create(&self, dn: &str, attributes: AttributeSet) -> ConnectorResult<Uid> {
        let mut state = self.state.lock().unwrap();
        if state.position(dn).is_some() {
            return Err(ConnectorError::ObjectAlreadyExists {
                identifier: dn.to_string(),
            });
        }
        let (_, parent) = split_dn(dn);
        if state.position(parent).is_none() {
            return Err(ConnectorError::ObjectNotFound {
                identifier: parent.to_string(),
            });
        }

        let attributes = attributes
            .iter()
            .map(|(name, value)| (name.clone(), to_strings(value)))
            .collect();
        state.insert(dn, attributes);
        state.operations.push(format!("add {dn}"));
        Ok(Uid::from_dn(dn))
    }
}

#[async_trait]
impl UpdateOp for MemoryDirectory {
    async fn update(&self, uid: &Uid, changes: AttributeDelta) -> ConnectorResult<Uid> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = state.position(uid.value()) else {
            return Err(ConnectorError::ObjectNotFound {
                identifier: uid.value().to_string(),
            });
        };
        // DN-valued member references must point at existing entries.
        if let Some((_, value)) = changes
            .add
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("member"))
        {
            if let Some(missing) = to_strings(value)
                .into_iter()
                .find(|v| state.position(v).is_none())
            {
                return Err(ConnectorError::ObjectNotFound { identifier: missing });
            }
        }
        let entry = &mut state.entries[index];

        for (name, value) in &changes.add {
            for v in to_strings(value) {
                if entry.has_value(name, &v) {
                    return Err(ConnectorError::ObjectAlreadyExists {
                        identifier: format!("{name}={v}"),
                    });
                }
                entry.values_mut(name).push(v);
            }
        }
        for (name, value) in &changes.remove {
            for v in to_strings(value) {
                if !entry.has_value(name, &v) {
                    return Err(ConnectorError::operation_failed(format!(
                        "LDAP modify failed with code 16: no such attribute {name}={v}"
                    )));
                }
                entry.values_mut(name).retain(|x| !x.eq_ignore_ascii_case(&v));
            }
            if entry.values(name).is_some_and(Vec::is_empty) {
                entry.set(name, Vec::new());
            }
        }
        for (name, value) in &changes.replace {
            entry.set(name, to_strings(value));
        }
        for name in &changes.clear {
            entry.set(name, Vec::new());
        }

        let dn = entry.dn.clone();
        state.operations.push(format!(
            "modify {dn} [{}]",
            changes.affected_attributes().join(",")
        ));
        Ok(Uid::from_dn(dn))
    }
}

#[async_trait]
impl RenameOp for MemoryDirectory {
    async fn rename(
        &self,
        uid: &Uid,
        new_rdn: &str,
        new_parent: Option<&str>,
    ) -> ConnectorResult<Uid> {
        let mut state = self.state.lock().unwrap();
        let old_dn = uid.value().to_string();
        let Some(index) = state.position(&old_dn) else {
            return Err(ConnectorError::ObjectNotFound {
                identifier: old_dn,
            });
        };

        let parent = new_parent.unwrap_or(split_dn(&old_dn).1).to_string();
        if state.position(&parent).is_none() {
            return Err(ConnectorError::ObjectNotFound { identifier: parent });
        }
        let new_dn = format!("{new_rdn},{parent}");
        if !dn_eq(&new_dn, &old_dn) && state.position(&new_dn).is_some() {
            return Err(ConnectorError::ObjectAlreadyExists { identifier: new_dn });
        }

        {
            let entry = &mut state.entries[index];
            let (old_attr, _) = split_dn(&old_dn).0.split_once('=').unwrap_or_default();
            if let Some((attribute, value)) = new_rdn.split_once('=') {
                if !old_attr.is_empty() && !old_attr.eq_ignore_ascii_case(attribute) {
                    entry.set(old_attr, Vec::new());
                }
                entry.set(attribute, vec![value.to_string()]);
            }
        }

        let suffix = format!(",{}", normalize_dn(&old_dn));
        for entry in &mut state.entries {
            if dn_eq(&entry.dn, &old_dn) {
                entry.dn = new_dn.clone();
            } else if normalize_dn(&entry.dn).ends_with(&suffix) {
                let keep = entry.dn.len() - old_dn.len();
                entry.dn = format!("{}{new_dn}", &entry.dn[..keep]);
            }
            for value in entry.values_mut("member").iter_mut() {
                if dn_eq(value, &old_dn) {
                    *value = new_dn.clone();
                }
            }
            if entry.values("member").is_some_and(Vec::is_empty) {
                entry.set("member", Vec::new());
            }
        }

        state.operations.push(format!("modrdn {old_dn} -> {new_dn}"));
        Ok(Uid::from_dn(new_dn))
    }
}

#[async_trait]
impl DeleteOp for MemoryDirectory {
    async fn delete(&self, uid: &Uid) -> ConnectorResult<()> {
        let mut state = self.state.lock().unwrap();
        let dn = uid.value().to_string();
        let Some(index) = state.position(&dn) else {
            return Err(ConnectorError::ObjectNotFound { identifier: dn });
        };
        let entry_dn = state.entries[index].dn.clone();
        if state
            .entries
            .iter()
            .any(|e| !dn_eq(&e.dn, &entry_dn) && e.is_under(&entry_dn))
        {
            return Err(ConnectorError::operation_failed(format!(
                "LDAP delete failed with code 66: {dn} has children"
            )));
        }

        state.entries.remove(index);
        for entry in &mut state.entries {
            if let Some(members) = entry.values("member").cloned() {
                let kept: Vec<String> = members.into_iter().filter(|m| !dn_eq(m, &dn)).collect();
                entry.set("member", kept);
            }
        }
        state.operations.push(format!("delete {dn}"));
        Ok(())
    }
}

#[async_trait]
impl SearchOp for MemoryDirectory {
    async fn search(&self, request: SearchRequest) -> ConnectorResult<SearchResult> {
        let state = self.state.lock().unwrap();
        if state.position(&request.base).is_none() {
            return Err(ConnectorError::ObjectNotFound {
                identifier: request.base.clone(),
            });
        }

        let objects = state
            .entries
            .iter()
            .filter(|e| match request.scope {
                SearchScope::Base => dn_eq(&e.dn, &request.base),
                SearchScope::OneLevel => dn_eq(split_dn(&e.dn).1, &request.base),
                SearchScope::Subtree => e.is_under(&request.base),
            })
            .filter(|e| state.matches(e, &request.filter))
            .map(|e| state.to_attribute_set(e, &request))
            .collect();

        Ok(SearchResult::new(objects))
    }
}

/// A provider bound to a fresh memory directory.
pub fn provider(use_ssl: bool) -> (AdProvider, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::new());
    let provider = AdProvider::with_directory(directory.clone(), use_ssl);
    (provider, directory)
}
