//! The form surface: the user-editable value behind a details screen.
//!
//! Every mutation carries a [`MutationSource`] so the controller can tell a
//! keystroke from a value it wrote itself (restoring a draft, resetting
//! after discard). Only user-sourced changes are persisted as drafts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::screens::ScreenSpec;
use crate::types::{DbId, FieldMap};

/// Current value of a details form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub fields: FieldMap,
    #[serde(default)]
    pub relation_ids: Vec<DbId>,
}

impl FormState {
    pub fn new(fields: FieldMap, relation_ids: Vec<DbId>) -> Self {
        Self {
            fields,
            relation_ids,
        }
    }

    /// Blank form for a new entity of the given screen.
    pub fn blank(screen: &ScreenSpec) -> Self {
        Self::new(screen.blank_fields(), Vec::new())
    }
}

/// Who produced a form mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationSource {
    User,
    System,
}

/// A single mutation of the form surface.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEdit {
    /// Set one field to a raw (un-normalized) value.
    SetField { name: String, value: Value },
    /// Replace the relation selection with raw ids from the widget.
    SetRelations(Vec<Value>),
    /// Replace the whole form value.
    Replace(FormState),
}

/// A form mutation tagged with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct FormChange {
    pub source: MutationSource,
    pub edit: FormEdit,
}

impl FormChange {
    pub fn user(edit: FormEdit) -> Self {
        Self {
            source: MutationSource::User,
            edit,
        }
    }

    pub fn system(edit: FormEdit) -> Self {
        Self {
            source: MutationSource::System,
            edit,
        }
    }

    pub fn set_field(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::user(FormEdit::SetField {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn set_relations<I, V>(ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::user(FormEdit::SetRelations(
            ids.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn is_user(&self) -> bool {
        self.source == MutationSource::User
    }
}

fn is_whole_id(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < DbId::MAX as f64
}

/// Coerce raw relation ids to integers.
///
/// Numeric strings are parsed; floats must be finite, integral and within
/// `i64` range. Anything else is dropped. Order is kept as given.
pub fn normalize_relation_ids(raw: &[Value]) -> Vec<DbId> {
    raw.iter()
        .filter_map(|value| match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| is_whole_id(*f))
                    .map(|f| f as DbId)
            }),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed.parse::<DbId>().ok().or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| is_whole_id(*f))
                        .map(|f| f as DbId)
                })
            }
            _ => None,
        })
        .collect()
}

/// The bindable form value plus its enablement and load flags.
#[derive(Debug, Clone)]
pub struct FormSurface {
    state: FormState,
    enabled: bool,
    loaded: bool,
}

impl FormSurface {
    /// A disabled, not-yet-loaded surface holding the screen's blank value.
    pub fn new(screen: &ScreenSpec) -> Self {
        Self {
            state: FormState::blank(screen),
            enabled: false,
            loaded: false,
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    /// Apply an edit, normalizing values through the screen's field specs.
    ///
    /// Edits to fields the screen does not declare are ignored. Returns
    /// `true` if the stored value changed.
    pub fn apply(&mut self, screen: &ScreenSpec, edit: FormEdit) -> bool {
        let before = self.state.clone();
        match edit {
            FormEdit::SetField { name, value } => {
                if let Some(spec) = screen.field(&name) {
                    self.state.fields.insert(name, spec.normalize(&value));
                }
            }
            FormEdit::SetRelations(raw) => {
                if screen.has_relation() {
                    self.state.relation_ids = normalize_relation_ids(&raw);
                }
            }
            FormEdit::Replace(state) => {
                self.state = FormState {
                    fields: screen.normalize_fields(&state.fields),
                    relation_ids: if screen.has_relation() {
                        state.relation_ids
                    } else {
                        Vec::new()
                    },
                };
            }
        }
        self.state != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens;
    use serde_json::json;

    #[test]
    fn relation_ids_are_coerced_and_filtered() {
        let raw = vec![
            json!(1),
            json!("2"),
            json!(3.0),
            json!(4.5),
            json!("abc"),
            json!(null),
            json!(" 7 "),
        ];
        assert_eq!(normalize_relation_ids(&raw), vec![1, 2, 3, 7]);
    }

    #[test]
    fn out_of_range_relation_ids_are_dropped() {
        let raw = vec![json!(1e20), json!("1e30"), json!(-1e19), json!(5)];
        assert_eq!(normalize_relation_ids(&raw), vec![5]);
    }

    #[test]
    fn new_surface_is_disabled_and_unloaded() {
        let surface = FormSurface::new(&screens::interviewer_team());
        assert!(!surface.is_enabled());
        assert!(!surface.is_loaded());
        assert_eq!(surface.state().fields.get("name"), Some(&json!("")));
    }

    #[test]
    fn set_field_normalizes_by_kind() {
        let screen = screens::interviewer_team();
        let mut surface = FormSurface::new(&screen);
        assert!(surface.apply(
            &screen,
            FormEdit::SetField {
                name: "isActive".into(),
                value: json!("false"),
            },
        ));
        assert_eq!(surface.state().fields.get("isActive"), Some(&json!(false)));
    }

    #[test]
    fn undeclared_fields_are_ignored() {
        let screen = screens::web_policy();
        let mut surface = FormSurface::new(&screen);
        let changed = surface.apply(
            &screen,
            FormEdit::SetField {
                name: "bogus".into(),
                value: json!("x"),
            },
        );
        assert!(!changed);
        assert!(!surface.state().fields.contains_key("bogus"));
    }

    #[test]
    fn relations_ignored_for_screens_without_one() {
        let screen = screens::email_template();
        let mut surface = FormSurface::new(&screen);
        assert!(!surface.apply(&screen, FormEdit::SetRelations(vec![json!(1)])));
        assert!(surface.state().relation_ids.is_empty());
    }

    #[test]
    fn change_constructors_tag_source() {
        assert!(FormChange::set_field("name", "x").is_user());
        assert!(!FormChange::system(FormEdit::SetRelations(vec![])).is_user());
    }
}
