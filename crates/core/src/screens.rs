//! Screen definitions for the editable details pages.
//!
//! Each details page runs the same [`DetailController`](crate::DetailController);
//! what differs between pages is captured here: the draft namespace, the
//! fields and how they are normalized and validated, and whether the entity
//! carries a relation collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::ValidateLength;

use crate::error::CoreError;
use crate::snapshot::RelationOrder;
use crate::types::FieldMap;

// ---------------------------------------------------------------------------
// Field specs
// ---------------------------------------------------------------------------

/// How a field's value is normalized before comparison and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Bool,
    Number,
}

/// Definition of a single editable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// JSON key of the field on the entity.
    pub name: String,
    /// Human-readable label used in validation messages.
    pub label: String,
    pub kind: FieldKind,
    /// Save is refused while a required text field is blank.
    pub required: bool,
    /// A draft is only written when at least one meaningful field is non-empty.
    pub meaningful: bool,
    /// Maximum length in characters for text fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u64>,
}

impl FieldSpec {
    pub fn text(name: &str, label: &str) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::Text,
            required: false,
            meaningful: false,
            max_len: None,
        }
    }

    pub fn boolean(name: &str, label: &str) -> Self {
        Self {
            kind: FieldKind::Bool,
            ..Self::text(name, label)
        }
    }

    pub fn number(name: &str, label: &str) -> Self {
        Self {
            kind: FieldKind::Number,
            ..Self::text(name, label)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn meaningful(mut self) -> Self {
        self.meaningful = true;
        self
    }

    pub fn max_len(mut self, max: u64) -> Self {
        self.max_len = Some(max);
        self
    }

    /// Value a blank form starts with for this field.
    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Text => Value::String(String::new()),
            FieldKind::Bool => Value::Bool(true),
            FieldKind::Number => Value::Null,
        }
    }

    /// Coerce a raw form value to this field's kind.
    ///
    /// Booleans accept `"true"`/`"false"`, numbers (non-zero is true) and
    /// `null` (false). Numbers accept numeric strings; anything unparsable or
    /// non-finite becomes `null`. Text accepts any scalar and renders it.
    pub fn normalize(&self, value: &Value) -> Value {
        match self.kind {
            FieldKind::Bool => Value::Bool(coerce_bool(value)),
            FieldKind::Number => coerce_number(value),
            FieldKind::Text => match value {
                Value::Null => Value::String(String::new()),
                Value::String(_) => value.clone(),
                Value::Bool(b) => Value::String(b.to_string()),
                Value::Number(n) => Value::String(n.to_string()),
                other => other.clone(),
            },
        }
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn coerce_number(value: &Value) -> Value {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::from(f as i64)
        }
        Some(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        None => Value::Null,
    }
}

/// Whether a field value counts as empty for the draft guard.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Screen spec
// ---------------------------------------------------------------------------

/// Everything the controller needs to know about one details screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSpec {
    /// Draft key prefix; keys take the form `{namespace}:{id|new}`.
    pub namespace: String,
    /// Singular entity name used in notifications, e.g. `"Interviewer team"`.
    pub entity_label: String,
    pub fields: Vec<FieldSpec>,
    /// JSON key of the relation collection, if the entity has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default)]
    pub relation_order: RelationOrder,
}

impl ScreenSpec {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_relation(&self) -> bool {
        self.relation.is_some()
    }

    /// Field map of a brand-new entity.
    pub fn blank_fields(&self) -> FieldMap {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.default_value()))
            .collect()
    }

    /// Normalize a field map: declared fields are coerced to their kind,
    /// missing declared fields get their default, and undeclared keys are
    /// dropped.
    pub fn normalize_fields(&self, fields: &FieldMap) -> FieldMap {
        self.fields
            .iter()
            .map(|spec| {
                let value = fields
                    .get(&spec.name)
                    .map_or_else(|| spec.default_value(), |v| spec.normalize(v));
                (spec.name.clone(), value)
            })
            .collect()
    }

    /// Returns `true` if every meaningful field in `fields` is blank.
    ///
    /// When no field is flagged meaningful, every text field counts.
    pub fn meaningful_fields_blank(&self, fields: &FieldMap) -> bool {
        let any_flagged = self.fields.iter().any(|f| f.meaningful);
        self.fields
            .iter()
            .filter(|f| {
                if any_flagged {
                    f.meaningful
                } else {
                    f.kind == FieldKind::Text
                }
            })
            .all(|f| fields.get(&f.name).map_or(true, is_blank))
    }

    /// Check required and length constraints on a field map.
    ///
    /// Returns the first violation as a [`CoreError::Validation`].
    pub fn validate(&self, fields: &FieldMap) -> Result<(), CoreError> {
        for spec in self.fields.iter().filter(|f| f.kind == FieldKind::Text) {
            let text = fields
                .get(&spec.name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim();

            if spec.required && !text.validate_length(Some(1_u64), None, None) {
                return Err(CoreError::Validation(format!(
                    "{} is required",
                    spec.label
                )));
            }
            if let Some(max) = spec.max_len {
                if !text.validate_length(None, Some(max), None) {
                    return Err(CoreError::Validation(format!(
                        "{} must be at most {max} characters",
                        spec.label
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Concrete screens
// ---------------------------------------------------------------------------

/// Interviewer team details: team name, status, and member interviewers.
pub fn interviewer_team() -> ScreenSpec {
    ScreenSpec {
        namespace: "interviewer-teams-details".into(),
        entity_label: "Interviewer team".into(),
        fields: vec![
            FieldSpec::text("name", "Team name")
                .required()
                .meaningful()
                .max_len(100),
            FieldSpec::boolean("isActive", "Active"),
        ],
        relation: Some("memberIds".into()),
        relation_order: RelationOrder::Insensitive,
    }
}

/// Email template details.
pub fn email_template() -> ScreenSpec {
    ScreenSpec {
        namespace: "emailtpl:draft".into(),
        entity_label: "Email template".into(),
        fields: vec![
            FieldSpec::text("name", "Template name").required(),
            FieldSpec::text("subject", "Subject")
                .required()
                .meaningful()
                .max_len(255),
            FieldSpec::text("body", "Body").meaningful(),
            FieldSpec::boolean("isActive", "Active"),
        ],
        relation: None,
        relation_order: RelationOrder::Insensitive,
    }
}

/// Web policy details.
pub fn web_policy() -> ScreenSpec {
    ScreenSpec {
        namespace: "web-policy-details".into(),
        entity_label: "Web policy".into(),
        fields: vec![
            FieldSpec::text("title", "Title")
                .required()
                .meaningful()
                .max_len(200),
            FieldSpec::text("content", "Content").meaningful(),
            FieldSpec::boolean("isActive", "Active"),
        ],
        relation: None,
        relation_order: RelationOrder::Insensitive,
    }
}

/// Look up a screen by its short name (`team`, `template`, `policy`).
pub fn by_name(name: &str) -> Result<ScreenSpec, CoreError> {
    match name {
        "team" | "interviewer-team" => Ok(interviewer_team()),
        "template" | "email-template" => Ok(email_template()),
        "policy" | "web-policy" => Ok(web_policy()),
        other => Err(CoreError::Validation(format!(
            "Unknown screen '{other}'. Must be one of: team, template, policy"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn bool_fields_coerce_strings_numbers_and_null() {
        let spec = FieldSpec::boolean("isActive", "Active");
        assert_eq!(spec.normalize(&json!("true")), json!(true));
        assert_eq!(spec.normalize(&json!("False")), json!(false));
        assert_eq!(spec.normalize(&json!(1)), json!(true));
        assert_eq!(spec.normalize(&json!(0)), json!(false));
        assert_eq!(spec.normalize(&Value::Null), json!(false));
    }

    #[test]
    fn number_fields_parse_strings_and_reject_garbage() {
        let spec = FieldSpec::number("order", "Order");
        assert_eq!(spec.normalize(&json!("42")), json!(42));
        assert_eq!(spec.normalize(&json!(7.0)), json!(7));
        assert_eq!(spec.normalize(&json!("abc")), Value::Null);
        assert_eq!(spec.normalize(&json!("NaN")), Value::Null);
    }

    #[test]
    fn normalize_fields_drops_unknown_and_fills_defaults() {
        let screen = interviewer_team();
        let normalized = screen.normalize_fields(&map(json!({"name": "Core", "extra": 1})));
        assert_eq!(normalized.get("name"), Some(&json!("Core")));
        assert_eq!(normalized.get("isActive"), Some(&json!(true)));
        assert!(!normalized.contains_key("extra"));
    }

    #[test]
    fn meaningful_blank_ignores_non_meaningful_fields() {
        let screen = email_template();
        let blank = map(json!({"name": "Welcome", "subject": "", "body": "  "}));
        assert!(screen.meaningful_fields_blank(&blank));

        let filled = map(json!({"name": "", "subject": "Hi", "body": ""}));
        assert!(!screen.meaningful_fields_blank(&filled));
    }

    #[test]
    fn validate_rejects_blank_required_field() {
        let screen = interviewer_team();
        let err = screen
            .validate(&map(json!({"name": "   ", "isActive": true})))
            .unwrap_err();
        assert_eq!(err, CoreError::Validation("Team name is required".into()));
    }

    #[test]
    fn validate_rejects_overlong_text() {
        let screen = interviewer_team();
        let long = "x".repeat(101);
        let err = screen.validate(&map(json!({"name": long}))).unwrap_err();
        assert!(err.to_string().contains("at most 100"));
    }

    #[test]
    fn validate_accepts_filled_form() {
        let screen = web_policy();
        assert!(screen
            .validate(&map(json!({"title": "Cookies", "content": ""})))
            .is_ok());
    }

    #[test]
    fn by_name_resolves_known_screens() {
        assert_eq!(by_name("team").unwrap().namespace, "interviewer-teams-details");
        assert_eq!(by_name("template").unwrap().namespace, "emailtpl:draft");
        assert!(by_name("widget").is_err());
    }
}
