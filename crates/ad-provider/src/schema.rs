//! Attribute and resource schema declarations.
//!
//! A [`Schema`] lists the attributes of a resource, data source or of the
//! provider configuration. It fills defaults (static and environment) and
//! validates configuration values before any directory call is made.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ProviderError, ProviderResult};

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Bool,
    Int,
    StringSet,
}

impl AttributeType {
    /// Whether a JSON value fits this type.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (AttributeType::String, Value::String(_)) => true,
            (AttributeType::Bool, Value::Bool(_)) => true,
            (AttributeType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (AttributeType::StringSet, Value::Array(items)) => items.iter().all(Value::is_string),
            _ => false,
        }
    }

    /// Parse an environment variable into a value of this type.
    pub fn parse_env(self, raw: &str) -> Option<Value> {
        match self {
            AttributeType::String => Some(Value::String(raw.to_string())),
            AttributeType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(Value::Bool(true)),
                "0" | "false" | "no" | "off" => Some(Value::Bool(false)),
                _ => None,
            },
            AttributeType::Int => raw.trim().parse::<i64>().ok().map(Value::from),
            AttributeType::StringSet => Some(Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            )),
        }
    }

    /// The empty value of this type, used when an attribute is unset.
    pub fn zero(self) -> Value {
        match self {
            AttributeType::String => Value::String(String::new()),
            AttributeType::Bool => Value::Bool(false),
            AttributeType::Int => Value::from(0),
            AttributeType::StringSet => Value::Array(Vec::new()),
        }
    }
}

/// Declaration of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_default: Option<String>,
}

impl Attribute {
    fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            description: String::new(),
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            env_default: None,
        }
    }

    /// A required attribute of the given type.
    pub fn required(attr_type: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(attr_type)
        }
    }

    /// An optional attribute of the given type.
    pub fn optional(attr_type: AttributeType) -> Self {
        Self {
            optional: true,
            ..Self::new(attr_type)
        }
    }

    /// A value computed by the provider.
    pub fn computed(attr_type: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(attr_type)
        }
    }

    pub fn required_string() -> Self {
        Self::required(AttributeType::String)
    }

    pub fn optional_string() -> Self {
        Self::optional(AttributeType::String)
    }

    pub fn computed_string() -> Self {
        Self::computed(AttributeType::String)
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Changing this attribute replaces the object.
    #[must_use]
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Never print the value.
    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Optional input that the provider fills in when unset.
    #[must_use]
    pub fn also_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Static default applied when the attribute is unset.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Environment variable consulted before the static default.
    #[must_use]
    pub fn with_env_default(mut self, var: impl Into<String>) -> Self {
        self.env_default = Some(var.into());
        self
    }

    /// Whether users may set this attribute.
    pub fn is_input(&self) -> bool {
        self.required || self.optional
    }
}

/// Attributes of a resource, data source or the provider itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Look up an attribute declaration.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Fill unset attributes from the process environment and static defaults.
    pub fn apply_defaults(&self, values: &mut Map<String, Value>) {
        self.apply_defaults_with(values, |var| std::env::var(var).ok());
    }

    /// Fill unset attributes, reading environment variables through `lookup`.
    ///
    /// An explicit value wins over the environment, which wins over the
    /// static default.
    pub fn apply_defaults_with<F>(&self, values: &mut Map<String, Value>, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (name, attribute) in &self.attributes {
            if values.get(name).is_some_and(|v| !v.is_null()) {
                continue;
            }

            let from_env = attribute
                .env_default
                .as_deref()
                .and_then(&lookup)
                .and_then(|raw| attribute.attr_type.parse_env(&raw));

            if let Some(value) = from_env.or_else(|| attribute.default.clone()) {
                values.insert(name.clone(), value);
            }
        }
    }

    /// Check that required attributes are present and values have the
    /// declared types. Unknown and computed-only attributes are rejected.
    pub fn validate(&self, values: &Map<String, Value>) -> ProviderResult<()> {
        let mut problems = Vec::new();

        for (name, attribute) in &self.attributes {
            let value = values.get(name).filter(|v| !v.is_null());
            match value {
                None if attribute.required => {
                    problems.push(format!("missing required attribute '{name}'"));
                }
                Some(v) if !attribute.attr_type.accepts(v) => {
                    problems.push(format!(
                        "attribute '{name}' must be of type {:?}",
                        attribute.attr_type
                    ));
                }
                _ => {}
            }
        }

        for (name, value) in values {
            match self.attributes.get(name) {
                None if name != "id" => {
                    problems.push(format!("unsupported attribute '{name}'"));
                }
                Some(attribute) if !attribute.is_input() && !value.is_null() => {
                    problems.push(format!("attribute '{name}' is computed and cannot be set"));
                }
                _ => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(problems))
        }
    }
}

/// Schemas of everything a provider serves.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<String, Schema>,
    pub data_sources: BTreeMap<String, Schema>,
}
