//! Resource state handed to resource and data source handlers.

use serde_json::{Map, Value};

use crate::error::{ProviderError, ProviderResult};

/// Identifier plus attribute values of one resource instance.
///
/// During updates the values of the previous state are kept as `prior`, so
/// handlers can ask which attributes changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    values: Map<String, Value>,
    prior: Option<Map<String, Value>>,
}

impl ResourceData {
    /// Build from configuration values; the id starts empty.
    pub fn from_config(values: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            values,
            prior: None,
        }
    }

    /// Build from a stored state object (`{"id": ..., attributes...}`).
    pub fn from_state(state: Value) -> ProviderResult<Self> {
        let Value::Object(mut values) = state else {
            return Err(ProviderError::invalid_attribute(
                "state",
                "resource state must be a JSON object",
            ));
        };

        let id = match values.remove("id") {
            Some(Value::String(id)) => id,
            Some(Value::Null) | None => String::new(),
            Some(other) => {
                return Err(ProviderError::invalid_attribute(
                    "id",
                    format!("expected a string, got {other}"),
                ))
            }
        };

        Ok(Self {
            id,
            values,
            prior: None,
        })
    }

    /// Attach the previous state for change detection.
    #[must_use]
    pub fn with_prior(mut self, prior: &ResourceData) -> Self {
        self.prior = Some(prior.values.clone());
        if self.id.is_empty() {
            self.id = prior.id.clone();
        }
        self
    }

    /// Serialize as a state object.
    pub fn to_state(&self) -> Value {
        let mut state = self.values.clone();
        state.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(state)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Mark the object as gone.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Raw value, if set.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Whether the attribute holds a non-null value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// String value; empty when unset.
    pub fn get_string(&self, key: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Boolean value; false when unset.
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String set value; empty when unset.
    pub fn get_set(&self, key: &str) -> Vec<String> {
        self.get(key).map(string_list).unwrap_or_default()
    }

    /// Set a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Whether `key` differs from the prior state. Without prior state
    /// nothing has changed.
    pub fn has_change(&self, key: &str) -> bool {
        let Some(prior) = &self.prior else {
            return false;
        };
        !values_equal(prior.get(key), self.values.get(key))
    }

    /// `(old, new)` values of an attribute.
    pub fn get_change(&self, key: &str) -> (Value, Value) {
        let old = self
            .prior
            .as_ref()
            .and_then(|p| p.get(key).cloned())
            .unwrap_or(Value::Null);
        let new = self.values.get(key).cloned().unwrap_or(Value::Null);
        (old, new)
    }

    /// All attribute values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Strings of a JSON array (or a single string).
pub fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Compare two attribute values.
///
/// Unset, null, empty strings and empty arrays are all equal; arrays compare
/// as sets.
pub fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    fn is_empty(v: Option<&Value>) -> bool {
        match v {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            _ => false,
        }
    }

    if is_empty(a) && is_empty(b) {
        return true;
    }

    match (a, b) {
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            let mut x: Vec<String> = x.iter().map(Value::to_string).collect();
            let mut y: Vec<String> = y.iter().map(Value::to_string).collect();
            x.sort();
            x.dedup();
            y.sort();
            y.dedup();
            x == y
        }
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
