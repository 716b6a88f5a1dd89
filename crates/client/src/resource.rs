//! REST resource descriptions and wire-shape conversion.
//!
//! The API speaks flat JSON objects (`{"id": 3, "name": "...", "memberIds":
//! [1, 2]}`); the core works with [`EntityDto`] which splits the relation
//! collection out of the field map. Conversion lives here so the HTTP layer
//! stays shape-agnostic.

use serde_json::{Map, Value};

use hrdesk_core::form::normalize_relation_ids;
use hrdesk_core::ports::{EntityDto, EntityPayload};
use hrdesk_core::types::DbId;

use crate::api::ApiError;

/// One REST collection and its optional relation sub-resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    /// Collection path under the API base URL, e.g. `interviewer-teams`.
    pub path: &'static str,
    /// Entity name used in not-found errors.
    pub entity: &'static str,
    /// JSON key holding the relation ids on the entity body.
    pub relation_field: Option<&'static str>,
    /// Sub-resource path for relation add/remove calls.
    pub relation_path: Option<&'static str>,
}

impl Resource {
    pub const INTERVIEWER_TEAMS: Resource = Resource {
        path: "interviewer-teams",
        entity: "InterviewerTeam",
        relation_field: Some("memberIds"),
        relation_path: Some("members"),
    };

    pub const EMAIL_TEMPLATES: Resource = Resource {
        path: "email-templates",
        entity: "EmailTemplate",
        relation_field: None,
        relation_path: None,
    };

    pub const WEB_POLICIES: Resource = Resource {
        path: "web-policies",
        entity: "WebPolicy",
        relation_field: None,
        relation_path: None,
    };

    /// Resource backing a details screen, by the screen's short name.
    pub fn for_screen(name: &str) -> Option<Resource> {
        match name {
            "team" | "interviewer-team" => Some(Self::INTERVIEWER_TEAMS),
            "template" | "email-template" => Some(Self::EMAIL_TEMPLATES),
            "policy" | "web-policy" => Some(Self::WEB_POLICIES),
            _ => None,
        }
    }

    pub fn collection_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.path)
    }

    pub fn item_url(&self, base: &str, id: DbId) -> String {
        format!("{}/{id}", self.collection_url(base))
    }

    /// URL of one relation link, or `None` if the resource has no relation.
    pub fn relation_url(&self, base: &str, id: DbId, child_id: DbId) -> Option<String> {
        self.relation_path
            .map(|rel| format!("{}/{rel}/{child_id}", self.item_url(base, id)))
    }

    /// Split a flat entity body into an [`EntityDto`].
    ///
    /// Relation entries may be bare ids or objects carrying an `id`.
    pub fn entity_from_wire(&self, body: Value) -> Result<EntityDto, ApiError> {
        let Value::Object(mut fields) = body else {
            return Err(ApiError::Shape(format!(
                "{} body is not a JSON object",
                self.entity
            )));
        };

        let id = fields
            .remove("id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| ApiError::Shape(format!("{} body has no numeric id", self.entity)))?;

        let relation_ids = match self.relation_field {
            Some(key) => match fields.remove(key) {
                Some(Value::Array(items)) => {
                    let raw: Vec<Value> = items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(mut obj) => obj.remove("id").unwrap_or(Value::Null),
                            other => other,
                        })
                        .collect();
                    normalize_relation_ids(&raw)
                }
                _ => Vec::new(),
            },
            None => Vec::new(),
        };

        Ok(EntityDto {
            id,
            fields,
            relation_ids,
        })
    }

    /// Flatten a payload into the body the API expects.
    pub fn payload_to_wire(&self, payload: &EntityPayload) -> Value {
        let mut body: Map<String, Value> = payload.fields.clone();
        body.remove("id");
        if let (Some(key), Some(ids)) = (self.relation_field, &payload.relation_ids) {
            body.insert(key.to_string(), Value::from(ids.clone()));
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "http://localhost:8080/api/v1/";

    #[test]
    fn urls_are_built_under_base() {
        let r = Resource::INTERVIEWER_TEAMS;
        assert_eq!(
            r.collection_url(BASE),
            "http://localhost:8080/api/v1/interviewer-teams"
        );
        assert_eq!(
            r.item_url(BASE, 4),
            "http://localhost:8080/api/v1/interviewer-teams/4"
        );
        assert_eq!(
            r.relation_url(BASE, 4, 9).as_deref(),
            Some("http://localhost:8080/api/v1/interviewer-teams/4/members/9")
        );
        assert_eq!(Resource::WEB_POLICIES.relation_url(BASE, 4, 9), None);
    }

    #[test]
    fn screen_names_resolve() {
        assert_eq!(Resource::for_screen("template"), Some(Resource::EMAIL_TEMPLATES));
        assert_eq!(Resource::for_screen("candidates"), None);
    }
}
