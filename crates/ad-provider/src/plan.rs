//! Plan computation: what an apply would do to one resource.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::data::values_equal;
use crate::schema::Schema;

/// Placeholder shown instead of sensitive values.
pub const SENSITIVE_PLACEHOLDER: &str = "(sensitive)";

/// Action needed to reach the proposed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update,
    Replace,
    NoOp,
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanAction::Create => write!(f, "create"),
            PlanAction::Update => write!(f, "update"),
            PlanAction::Replace => write!(f, "replace"),
            PlanAction::NoOp => write!(f, "no-op"),
        }
    }
}

/// One attribute difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Value,
    pub after: Value,
    pub forces_replacement: bool,
}

/// Result of planning one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    pub action: PlanAction,
    pub changes: Vec<AttributeChange>,
    /// Proposed values merged with computed values of the prior state.
    pub planned_state: Value,
}

impl PlanResult {
    /// Whether applying this plan touches the directory.
    pub fn has_changes(&self) -> bool {
        self.action != PlanAction::NoOp
    }

    /// Names of changed attributes.
    pub fn changed_attributes(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Compare proposed configuration with prior state.
///
/// Computed attributes the configuration leaves unset keep their prior
/// values and never cause a diff.
pub fn compute_plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let proposed_map = proposed.as_object().cloned().unwrap_or_default();

    let Some(prior_map) = prior.and_then(Value::as_object) else {
        let changes = schema
            .attributes
            .iter()
            .filter_map(|(name, attribute)| {
                let after = proposed_map.get(name).filter(|v| !v.is_null())?;
                Some(AttributeChange {
                    name: name.clone(),
                    before: Value::Null,
                    after: display_value(attribute.sensitive, after),
                    forces_replacement: false,
                })
            })
            .collect();

        return PlanResult {
            action: PlanAction::Create,
            changes,
            planned_state: Value::Object(proposed_map),
        };
    };

    let mut planned: Map<String, Value> = proposed_map.clone();
    if let Some(id) = prior_map.get("id") {
        planned.insert("id".to_string(), id.clone());
    }

    let mut changes = Vec::new();
    for (name, attribute) in &schema.attributes {
        let before = prior_map.get(name);
        let after = proposed_map.get(name).filter(|v| !v.is_null());

        if attribute.computed && after.is_none() {
            if let Some(value) = before {
                planned.insert(name.clone(), value.clone());
            }
            continue;
        }

        if !attribute.is_input() || values_equal(before, after) {
            continue;
        }

        changes.push(AttributeChange {
            name: name.clone(),
            before: before
                .map(|v| display_value(attribute.sensitive, v))
                .unwrap_or(Value::Null),
            after: after
                .map(|v| display_value(attribute.sensitive, v))
                .unwrap_or(Value::Null),
            forces_replacement: attribute.force_new,
        });
    }

    let action = if changes.is_empty() {
        PlanAction::NoOp
    } else if changes.iter().any(|c| c.forces_replacement) {
        PlanAction::Replace
    } else {
        PlanAction::Update
    };

    PlanResult {
        action,
        changes,
        planned_state: Value::Object(planned),
    }
}

fn display_value(sensitive: bool, value: &Value) -> Value {
    if sensitive {
        Value::String(SENSITIVE_PLACEHOLDER.to_string())
    } else {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeType};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("domain", Attribute::required_string().force_new())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("password", Attribute::required_string().sensitive())
            .with_attribute("members", Attribute::optional(AttributeType::StringSet))
            .with_attribute("dn", Attribute::computed_string())
    }

    fn prior() -> Value {
        json!({
            "id": "guid-1",
            "name": "Admins",
            "domain": "example.com",
            "description": "",
            "password": "old",
            "members": ["cn=a", "cn=b"],
            "dn": "cn=Admins,cn=Users,dc=example,dc=com"
        })
    }

    #[test]
    fn test_plan_create() {
        let proposed = json!({"name": "Admins", "domain": "example.com", "password": "pw"});
        let plan = compute_plan(&schema(), None, &proposed);
        assert_eq!(plan.action, PlanAction::Create);
        assert_eq!(plan.changes.len(), 3);
        let pw = plan.changes.iter().find(|c| c.name == "password").unwrap();
        assert_eq!(pw.after, json!(SENSITIVE_PLACEHOLDER));
    }

    #[test]
    fn test_plan_noop_ignores_computed_and_set_order() {
        let proposed = json!({
            "name": "Admins",
            "domain": "example.com",
            "password": "old",
            "members": ["cn=b", "cn=a"]
        });
        let plan = compute_plan(&schema(), Some(&prior()), &proposed);
        assert_eq!(plan.action, PlanAction::NoOp);
        assert!(!plan.has_changes());
        assert_eq!(
            plan.planned_state["dn"],
            json!("cn=Admins,cn=Users,dc=example,dc=com")
        );
        assert_eq!(plan.planned_state["id"], json!("guid-1"));
    }

    #[test]
    fn test_plan_update() {
        let proposed = json!({
            "name": "Admins",
            "domain": "example.com",
            "description": "Domain admins",
            "password": "new",
            "members": ["cn=a"]
        });
        let plan = compute_plan(&schema(), Some(&prior()), &proposed);
        assert_eq!(plan.action, PlanAction::Update);
        assert_eq!(
            plan.changed_attributes(),
            vec!["description", "members", "password"]
        );
        let pw = plan.changes.iter().find(|c| c.name == "password").unwrap();
        assert_eq!(pw.before, json!(SENSITIVE_PLACEHOLDER));
    }

    #[test]
    fn test_plan_replace_on_force_new() {
        let proposed = json!({
            "name": "Admins",
            "domain": "corp.example.com",
            "password": "old",
            "members": ["cn=a", "cn=b"]
        });
        let plan = compute_plan(&schema(), Some(&prior()), &proposed);
        assert_eq!(plan.action, PlanAction::Replace);
        assert!(plan.changes[0].forces_replacement);
    }

    #[test]
    fn test_plan_action_display() {
        assert_eq!(PlanAction::NoOp.to_string(), "no-op");
        assert_eq!(PlanAction::Replace.to_string(), "replace");
    }
}
