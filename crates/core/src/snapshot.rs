//! Baseline snapshots and dirty checking.
//!
//! A [`Snapshot`] is the last-known-saved (or load-time) value of a form.
//! Dirtiness is a comparison of stable serializations: object keys are
//! emitted in sorted order so field order never produces a false positive.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::FormState;
use crate::screens::ScreenSpec;
use crate::types::{DbId, FieldMap};

/// Whether the order of selected relation ids matters for dirtiness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOrder {
    /// Ids are sorted and deduplicated before comparison.
    #[default]
    Insensitive,
    /// Ids compare element-wise in selection order.
    Significant,
}

impl RelationOrder {
    /// Canonical form of a relation selection under this policy.
    pub fn canonical(self, ids: &[DbId]) -> Vec<DbId> {
        match self {
            Self::Insensitive => {
                let mut ids = ids.to_vec();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
            Self::Significant => ids.to_vec(),
        }
    }
}

impl std::str::FromStr for RelationOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insensitive" => Ok(Self::Insensitive),
            "significant" => Ok(Self::Significant),
            other => Err(format!(
                "Invalid relation order '{other}'. Must be one of: insensitive, significant"
            )),
        }
    }
}

/// Immutable normalized copy of a form value.
///
/// Snapshots are replaced wholesale; there is no way to mutate one in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    fields: FieldMap,
    relation_ids: Vec<DbId>,
}

impl Snapshot {
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn relation_ids(&self) -> &[DbId] {
        &self.relation_ids
    }

    /// The form value this snapshot was captured from (normalized).
    pub fn to_form_state(&self) -> FormState {
        FormState::new(self.fields.clone(), self.relation_ids.clone())
    }

    fn stable(&self) -> String {
        stable_serialize(&serde_json::json!({
            "fields": Value::Object(self.fields.clone()),
            "relation_ids": self.relation_ids,
        }))
    }
}

/// Capture a normalized snapshot of a form value.
pub fn capture_baseline(screen: &ScreenSpec, form: &FormState) -> Snapshot {
    Snapshot {
        fields: screen.normalize_fields(&form.fields),
        relation_ids: if screen.has_relation() {
            form.relation_ids.clone()
        } else {
            Vec::new()
        },
    }
}

/// Returns `true` if `form` differs structurally from `baseline`.
///
/// Relation ids are compared under the screen's [`RelationOrder`].
pub fn is_dirty(screen: &ScreenSpec, form: &FormState, baseline: &Snapshot) -> bool {
    let current = canonical(screen, &capture_baseline(screen, form));
    current.stable() != canonical(screen, baseline).stable()
}

fn canonical(screen: &ScreenSpec, snapshot: &Snapshot) -> Snapshot {
    Snapshot {
        fields: snapshot.fields.clone(),
        relation_ids: screen.relation_order.canonical(&snapshot.relation_ids),
    }
}

/// Serialize a JSON value with object keys in sorted order at every depth.
///
/// Arrays keep their element order.
pub fn stable_serialize(value: &Value) -> String {
    let mut out = String::new();
    write_stable(value, &mut out);
    out
}

fn write_stable(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Keys are strings; Display of a Value::String is its JSON form.
                let _ = write!(out, "{}", Value::String(key.clone()));
                out.push(':');
                write_stable(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_stable(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}
