//! Integration tests for the JSON-file draft store, including its use
//! behind the core draft persistence layer.

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;

use hrdesk_core::draft::{DraftPersistence, DraftRecord, DraftWrite};
use hrdesk_core::error::CoreError;
use hrdesk_core::form::FormState;
use hrdesk_core::ports::DraftStore;
use hrdesk_core::screens;
use hrdesk_store::{FileDraftStore, FileStoreError};

#[test]
fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drafts.json");

    let store = FileDraftStore::open(&path).unwrap();
    store.set_item("interviewer-teams-details:3", "{\"a\":1}").unwrap();
    store.set_item("web-policy-details:new", "{}").unwrap();
    store.remove_item("web-policy-details:new").unwrap();
    drop(store);

    let reopened = FileDraftStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(
        reopened.get_item("interviewer-teams-details:3").unwrap().as_deref(),
        Some("{\"a\":1}")
    );
    assert_eq!(reopened.get_item("web-policy-details:new").unwrap(), None);
}

#[test]
fn corrupt_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drafts.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let err = FileDraftStore::open(&path).err().expect("open should fail");
    assert_matches!(err, FileStoreError::Corrupt { .. });
    assert_matches!(CoreError::from(err), CoreError::Storage(_));
}

#[test]
fn draft_round_trip_through_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drafts.json");
    let store: Arc<dyn DraftStore> = Arc::new(FileDraftStore::open(&path).unwrap());
    let drafts = DraftPersistence::new(Arc::new(screens::interviewer_team()), store);

    let mut fields = serde_json::Map::new();
    fields.insert("name".into(), json!("Backend panel"));
    fields.insert("isActive".into(), json!(true));
    let record = DraftRecord::from_form(&FormState::new(fields, vec![2, 5]));

    assert_eq!(drafts.write(Some(9), &record).unwrap(), DraftWrite::Written);
    assert_eq!(drafts.write(Some(9), &record).unwrap(), DraftWrite::SkippedUnchanged);

    let reopened: Arc<dyn DraftStore> = Arc::new(FileDraftStore::open(&path).unwrap());
    let drafts = DraftPersistence::new(Arc::new(screens::interviewer_team()), reopened);
    let record = drafts.read(Some(9)).unwrap().expect("draft should be stored");
    assert_eq!(record.fields["name"], json!("Backend panel"));
    assert_eq!(record.relation_ids, vec![2, 5]);

    drafts.clear(Some(9)).unwrap();
    assert_eq!(drafts.read(Some(9)).unwrap(), None);
}

#[test]
fn failed_write_is_not_kept_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("not-yet-created");
    let path = parent.join("drafts.json");
    let store: Arc<dyn DraftStore> = Arc::new(FileDraftStore::open(&path).unwrap());
    let drafts = DraftPersistence::new(Arc::new(screens::web_policy()), store.clone());

    let mut fields = serde_json::Map::new();
    fields.insert("title".into(), json!("Cookie policy"));
    let record = DraftRecord::from_form(&FormState::new(fields, vec![]));

    assert_matches!(drafts.write(Some(4), &record), Err(CoreError::Storage(_)));
    assert_eq!(store.get_item("web-policy-details:4").unwrap(), None);

    std::fs::create_dir(&parent).unwrap();
    assert_eq!(drafts.write(Some(4), &record).unwrap(), DraftWrite::Written);

    let reopened = FileDraftStore::open(&path).unwrap();
    assert!(reopened.get_item("web-policy-details:4").unwrap().is_some());
}
