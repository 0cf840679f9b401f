//! Request and result types shared by directory backends.
//!
//! Entries are written by DN and read back as [`AttributeSet`]s; changes to
//! an existing entry travel as an [`AttributeDelta`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// DN of the entry a write operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn from_dn(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributes of one entry, to add or as returned by a search.
///
/// Search results carry the entry DN under `dn`. Names are matched
/// case-insensitively when no exact key exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    #[serde(flatten)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Like [`with`](Self::with), skipping empty strings. AD rejects adds
    /// with empty values.
    pub fn with_non_empty(self, name: impl Into<String>, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.with(name, value)
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// First string value of an attribute.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| match v {
            AttributeValue::Array(values) => values.iter().find_map(|v| v.as_string()),
            other => other.as_string(),
        })
    }

    /// All string values of an attribute; empty when absent.
    pub fn get_strings(&self, name: &str) -> Vec<&str> {
        match self.get(name) {
            Some(AttributeValue::String(s)) => vec![s.as_str()],
            Some(AttributeValue::Array(values)) => {
                values.iter().filter_map(|v| v.as_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn dn(&self) -> Option<&str> {
        self.get_string("dn")
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }
}

/// Value of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    String(String),
    Integer(i64),
    /// Sent to the directory as-is (e.g. `unicodePwd`).
    Binary(Vec<u8>),
    /// Multi-valued attribute.
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value; decimal strings (as the directory returns them) are
    /// parsed.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Wire form: one octet string per value.
    pub fn to_octets(&self) -> Vec<Vec<u8>> {
        match self {
            AttributeValue::Null => Vec::new(),
            AttributeValue::String(s) => vec![s.as_bytes().to_vec()],
            AttributeValue::Integer(i) => vec![i.to_string().into_bytes()],
            AttributeValue::Binary(b) => vec![b.clone()],
            AttributeValue::Array(values) => values.iter().flat_map(Self::to_octets).collect(),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<&String> for AttributeValue {
    fn from(s: &String) -> Self {
        AttributeValue::String(s.clone())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttributeValue::Binary(bytes)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::Array(values.into_iter().map(AttributeValue::String).collect())
    }
}

/// Modification of an existing entry.
///
/// Maps onto one LDAP modify request: `add` and `remove` touch single values
/// of multi-valued attributes, `replace` overwrites and `clear` deletes all
/// values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeDelta {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub add: BTreeMap<String, AttributeValue>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub remove: BTreeMap<String, AttributeValue>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replace: BTreeMap<String, AttributeValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clear: Vec<String>,
}

impl AttributeDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> &mut Self {
        self.add.insert(name.into(), value.into());
        self
    }

    pub fn remove(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> &mut Self {
        self.remove.insert(name.into(), value.into());
        self
    }

    pub fn replace(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> &mut Self {
        self.replace.insert(name.into(), value.into());
        self
    }

    pub fn clear_attribute(&mut self, name: impl Into<String>) -> &mut Self {
        self.clear.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
            && self.remove.is_empty()
            && self.replace.is_empty()
            && self.clear.is_empty()
    }

    /// Sorted, deduplicated names of every attribute the delta touches.
    pub fn affected_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .add
            .keys()
            .chain(self.remove.keys())
            .chain(self.replace.keys())
            .chain(self.clear.iter())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Filter for search operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Match objects where attribute equals value. The value is escaped when
    /// rendered.
    Equals { attribute: String, value: String },

    /// Match objects where attribute equals an already escaped assertion
    /// value (e.g. `\ab\cd` octet escapes for binary attributes).
    EqualsEscaped { attribute: String, value: String },

    /// Match objects where attribute exists (has any value).
    Present { attribute: String },

    /// Logical AND of multiple filters.
    And { filters: Vec<Filter> },
}

impl Filter {
    /// Create an equals filter.
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an equals filter whose value is already escaped.
    pub fn eq_escaped(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::EqualsEscaped {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create a present (attribute exists) filter.
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    /// Combine this filter with another using AND.
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And { mut filters } => {
                filters.push(other);
                Filter::And { filters }
            }
            _ => Filter::And {
                filters: vec![self, other],
            },
        }
    }
}

/// Scope of a directory search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry.
    Base,
    /// Immediate children of the base entry.
    OneLevel,
    /// The base entry and all descendants.
    #[default]
    Subtree,
}

/// A directory search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search base DN.
    pub base: String,
    /// Search scope.
    #[serde(default)]
    pub scope: SearchScope,
    /// Search filter.
    pub filter: Filter,
    /// Attributes to return; empty means all user attributes.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Ask the server to return entry DNs in extended form
    /// (`<GUID=..>;<SID=..>;dn`).
    #[serde(default)]
    pub extended_dn: bool,
}

impl SearchRequest {
    /// Create a subtree search.
    pub fn new(base: impl Into<String>, filter: Filter) -> Self {
        Self {
            base: base.into(),
            scope: SearchScope::Subtree,
            filter,
            attributes: Vec::new(),
            extended_dn: false,
        }
    }

    /// Set the search scope.
    #[must_use]
    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the attributes to return.
    #[must_use]
    pub fn with_attributes(mut self, attributes: &[&str]) -> Self {
        self.attributes = attributes.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Request extended DNs.
    #[must_use]
    pub fn with_extended_dn(mut self) -> Self {
        self.extended_dn = true;
        self
    }
}

/// Result of a search operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching objects. Each carries its DN under the `dn` attribute.
    pub objects: Vec<AttributeSet>,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(objects: Vec<AttributeSet>) -> Self {
        Self { objects }
    }

    /// Get the number of objects.
    pub fn count(&self) -> usize {
        self.objects.len()
    }
}
