//! Desired-state (YAML) and recorded-state (JSON) file models.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CliError, CliResult};

/// Root of a desired-state file.
///
/// ```yaml
/// version: "1"
/// provider:
///   domain: example.com
///   ip: 10.0.0.5
/// resources:
///   - type: ad_ou
///     name: engineering
///     config:
///       name: Engineering
///       domain: example.com
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredState {
    /// Format version; only "1" is supported.
    pub version: String,
    /// Provider configuration. Unset keys fall back to `AD_*` variables.
    #[serde(default)]
    pub provider: Map<String, Value>,
    /// Resources in apply order.
    #[serde(default)]
    pub resources: Vec<ResourceDecl>,
}

/// One declared resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDecl {
    /// Resource type, e.g. `ad_group`.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Local name, unique per type.
    pub name: String,
    /// Resource configuration.
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl ResourceDecl {
    /// `<type>.<name>`.
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

impl DesiredState {
    /// Load and parse a desired-state file.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Err(CliError::Validation(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| CliError::Io(format!("Failed to read file {}: {}", path.display(), e)))?;

        let desired: DesiredState = serde_yaml::from_str(&content).map_err(|e| {
            let location = if let Some(loc) = e.location() {
                format!(" at line {}, column {}", loc.line(), loc.column())
            } else {
                String::new()
            };
            CliError::Validation(format!("Invalid YAML{location}: {e}"))
        })?;
        desired.validate()?;
        Ok(desired)
    }

    /// Check the version and that every address is declared once.
    pub fn validate(&self) -> CliResult<()> {
        if self.version != "1" {
            return Err(CliError::Validation(format!(
                "Unsupported config version '{}'. Only version '1' is supported.",
                self.version
            )));
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if resource.name.is_empty() {
                return Err(CliError::Validation(format!(
                    "Resource of type '{}' has an empty name",
                    resource.resource_type
                )));
            }
            if !seen.insert(resource.address()) {
                return Err(CliError::Validation(format!(
                    "Resource '{}' is declared more than once",
                    resource.address()
                )));
            }
        }
        Ok(())
    }

    /// Provider configuration as a JSON object.
    pub fn provider_config(&self) -> Value {
        Value::Object(self.provider.clone())
    }
}

/// Recorded state of applied resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateFile {
    #[serde(default)]
    pub resources: Vec<StateEntry>,
}

/// State of one applied resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateEntry {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub state: Value,
}

impl StateEntry {
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

impl StateFile {
    /// Load a state file; a missing file is an empty state.
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            CliError::State(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write the state file. It holds passwords, so it is owner-only on Unix.
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&StateEntry> {
        self.resources.iter().find(|e| e.address() == address)
    }

    /// Record the state of a resource, keeping its position when present.
    pub fn upsert(&mut self, resource_type: &str, name: &str, state: Value) {
        let address = format!("{resource_type}.{name}");
        match self.resources.iter_mut().find(|e| e.address() == address) {
            Some(entry) => entry.state = state,
            None => self.resources.push(StateEntry {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                state,
            }),
        }
    }

    pub fn remove(&mut self, address: &str) {
        self.resources.retain(|e| e.address() != address);
    }

    /// Entries whose address is not declared, in recorded order.
    pub fn undeclared<'a>(&'a self, desired: &DesiredState) -> Vec<&'a StateEntry> {
        let declared: HashSet<String> = desired.resources.iter().map(|r| r.address()).collect();
        self.resources
            .iter()
            .filter(|e| !declared.contains(&e.address()))
            .collect()
    }
}
