//! Conversion between the API's flat JSON bodies and the core DTOs.

use assert_matches::assert_matches;
use serde_json::json;

use hrdesk_client::store::parse_interviewers;
use hrdesk_client::{ApiError, Resource};
use hrdesk_core::ports::EntityPayload;

#[test]
fn team_body_splits_relation_ids_out_of_fields() {
    let dto = Resource::INTERVIEWER_TEAMS
        .entity_from_wire(json!({
            "id": 12,
            "name": "Platform panel",
            "isActive": true,
            "memberIds": [3, "4", { "id": 7, "fullName": "Ada" }, null],
        }))
        .unwrap();

    assert_eq!(dto.id, 12);
    assert_eq!(dto.relation_ids, vec![3, 4, 7]);
    assert_eq!(dto.fields.get("name"), Some(&json!("Platform panel")));
    assert!(!dto.fields.contains_key("memberIds"));
    assert!(!dto.fields.contains_key("id"));
}

#[test]
fn body_without_id_is_a_shape_error() {
    let err = Resource::WEB_POLICIES
        .entity_from_wire(json!({ "title": "Cookies" }))
        .unwrap_err();
    assert_matches!(err, ApiError::Shape(_));

    let err = Resource::WEB_POLICIES
        .entity_from_wire(json!([1, 2]))
        .unwrap_err();
    assert_matches!(err, ApiError::Shape(_));
}

#[test]
fn create_payload_inlines_relations_update_payload_does_not() {
    let mut fields = serde_json::Map::new();
    fields.insert("name".into(), json!("New panel"));

    let create = EntityPayload {
        fields: fields.clone(),
        relation_ids: Some(vec![5, 6]),
    };
    assert_eq!(
        Resource::INTERVIEWER_TEAMS.payload_to_wire(&create),
        json!({ "name": "New panel", "memberIds": [5, 6] })
    );

    let update = EntityPayload {
        fields,
        relation_ids: None,
    };
    assert_eq!(
        Resource::INTERVIEWER_TEAMS.payload_to_wire(&update),
        json!({ "name": "New panel" })
    );
}

#[test]
fn interviewer_labels_fall_back_to_email_then_id() {
    let items = parse_interviewers(json!([
        { "id": 1, "fullName": "Grace Hopper", "email": "grace@example.com" },
        { "id": 2, "fullName": "  ", "email": "linus@example.com" },
        { "id": 3 },
    ]))
    .unwrap();

    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Grace Hopper", "linus@example.com", "Interviewer #3"]
    );
}
