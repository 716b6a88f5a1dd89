//! Draft persistence for unsaved form edits.
//!
//! Drafts live in an injected [`DraftStore`] under `{namespace}:{id|new}` and
//! are JSON-encoded [`DraftRecord`]s. [`DraftPersistence`] owns the key
//! format and the two write guards: an all-blank draft never overwrites the
//! stored one, and a draft identical to the stored one is not rewritten.
//! [`DraftDebouncer`] coalesces rapid form changes into one write.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::form::FormState;
use crate::ports::DraftStore;
use crate::screens::ScreenSpec;
use crate::types::{DbId, FieldMap, Timestamp};

/// Default delay between the last form change and the draft write.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Key suffix used for entities that have not been created yet.
pub const NEW_ENTITY_SENTINEL: &str = "new";

// ---------------------------------------------------------------------------
// Draft record
// ---------------------------------------------------------------------------

/// Persisted unsaved form content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub fields: FieldMap,
    #[serde(default)]
    pub relation_ids: Vec<DbId>,
    pub saved_at: Timestamp,
}

impl DraftRecord {
    pub fn from_form(form: &FormState) -> Self {
        Self {
            fields: form.fields.clone(),
            relation_ids: form.relation_ids.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Same fields and relations, ignoring `saved_at`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.fields == other.fields && self.relation_ids == other.relation_ids
    }

    pub fn to_form_state(&self) -> FormState {
        FormState::new(self.fields.clone(), self.relation_ids.clone())
    }
}

/// Result of a draft write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftWrite {
    Written,
    /// Every meaningful field was blank and no relation was selected.
    SkippedEmpty,
    /// The stored draft already holds identical content.
    SkippedUnchanged,
}

/// Build the storage key for a draft.
pub fn draft_key(namespace: &str, entity_id: Option<DbId>) -> String {
    match entity_id {
        Some(id) => format!("{namespace}:{id}"),
        None => format!("{namespace}:{NEW_ENTITY_SENTINEL}"),
    }
}

// ---------------------------------------------------------------------------
// DraftPersistence
// ---------------------------------------------------------------------------

/// Namespaced read/write/clear of drafts for one screen type.
#[derive(Clone)]
pub struct DraftPersistence {
    screen: Arc<ScreenSpec>,
    store: Arc<dyn DraftStore>,
}

impl DraftPersistence {
    pub fn new(screen: Arc<ScreenSpec>, store: Arc<dyn DraftStore>) -> Self {
        Self { screen, store }
    }

    pub fn key(&self, entity_id: Option<DbId>) -> String {
        draft_key(&self.screen.namespace, entity_id)
    }

    /// Returns `true` if the record carries nothing worth restoring.
    pub fn is_empty(&self, record: &DraftRecord) -> bool {
        self.screen.meaningful_fields_blank(&record.fields) && record.relation_ids.is_empty()
    }

    /// Persist a draft unless it is blank or identical to the stored one.
    pub fn write(
        &self,
        entity_id: Option<DbId>,
        record: &DraftRecord,
    ) -> Result<DraftWrite, CoreError> {
        if self.is_empty(record) {
            return Ok(DraftWrite::SkippedEmpty);
        }

        let key = self.key(entity_id);
        if let Some(existing) = self.read(entity_id)? {
            if existing.same_content(record) {
                return Ok(DraftWrite::SkippedUnchanged);
            }
        }

        let encoded = serde_json::to_string(record)
            .map_err(|e| CoreError::Internal(format!("Failed to encode draft: {e}")))?;
        self.store.set_item(&key, &encoded)?;
        tracing::debug!(key = %key, "Draft written");
        Ok(DraftWrite::Written)
    }

    /// Read the stored draft.
    ///
    /// A stored value that does not decode is logged and treated as absent.
    pub fn read(&self, entity_id: Option<DbId>) -> Result<Option<DraftRecord>, CoreError> {
        let key = self.key(entity_id);
        let Some(raw) = self.store.get_item(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<DraftRecord>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring undecodable draft");
                Ok(None)
            }
        }
    }

    pub fn clear(&self, entity_id: Option<DbId>) -> Result<(), CoreError> {
        let key = self.key(entity_id);
        self.store.remove_item(&key)?;
        tracing::debug!(key = %key, "Draft cleared");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DraftDebouncer
// ---------------------------------------------------------------------------

/// Deadline-based debouncer for draft writes.
///
/// Each [`schedule`](Self::schedule) replaces the pending draft and pushes
/// the deadline out by `delay`. The host flushes with
/// [`take_due`](Self::take_due) once the deadline has passed.
#[derive(Debug, Clone)]
pub struct DraftDebouncer {
    delay: Duration,
    pending: Option<(Instant, DraftRecord)>,
}

impl DraftDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, record: DraftRecord, now: Instant) {
        self.pending = Some((now + self.delay, record));
    }

    /// Deadline of the pending write, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending draft if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<DraftRecord> {
        match &self.pending {
            Some((at, _)) if *at <= now => self.pending.take().map(|(_, record)| record),
            _ => None,
        }
    }

    /// Take the pending draft regardless of its deadline.
    pub fn take(&mut self) -> Option<DraftRecord> {
        self.pending.take().map(|(_, record)| record)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl Default for DraftDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local [`DraftStore`] backed by a `HashMap`.
///
/// Used in tests and as the default store when nothing durable is wired in.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DraftStore for MemoryDraftStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        let items = self
            .items
            .read()
            .map_err(|_| CoreError::Storage("draft store lock poisoned".into()))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| CoreError::Storage("draft store lock poisoned".into()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), CoreError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| CoreError::Storage("draft store lock poisoned".into()))?;
        items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens;
    use serde_json::json;

    fn persistence(screen: ScreenSpec) -> (DraftPersistence, Arc<MemoryDraftStore>) {
        let store = Arc::new(MemoryDraftStore::new());
        (DraftPersistence::new(Arc::new(screen), store.clone()), store)
    }

    fn record(fields: serde_json::Value, relation_ids: Vec<DbId>) -> DraftRecord {
        DraftRecord::from_form(&FormState::new(
            fields.as_object().cloned().unwrap(),
            relation_ids,
        ))
    }

    #[test]
    fn key_uses_namespace_and_id_or_sentinel() {
        assert_eq!(draft_key("emailtpl:draft", Some(12)), "emailtpl:draft:12");
        assert_eq!(
            draft_key("interviewer-teams-details", None),
            "interviewer-teams-details:new"
        );
    }

    #[test]
    fn write_then_read_returns_same_content() {
        let (drafts, _) = persistence(screens::email_template());
        let draft = record(json!({"subject": "Hello", "body": "World"}), vec![]);

        assert_eq!(drafts.write(Some(3), &draft).unwrap(), DraftWrite::Written);
        let read = drafts.read(Some(3)).unwrap().expect("draft should exist");
        assert_eq!(read, draft);
    }

    #[test]
    fn blank_draft_does_not_clobber_existing_one() {
        let (drafts, _) = persistence(screens::email_template());
        let real = record(json!({"subject": "Offer", "body": "Details"}), vec![]);
        drafts.write(Some(3), &real).unwrap();

        let blank = record(json!({"subject": "", "body": ""}), vec![]);
        assert_eq!(drafts.write(Some(3), &blank).unwrap(), DraftWrite::SkippedEmpty);

        let stored = drafts.read(Some(3)).unwrap().unwrap();
        assert!(stored.same_content(&real));
    }

    #[test]
    fn identical_draft_is_not_rewritten() {
        let (drafts, store) = persistence(screens::web_policy());
        let first = record(json!({"title": "Privacy"}), vec![]);
        drafts.write(None, &first).unwrap();
        let raw_before = store.get_item("web-policy-details:new").unwrap();

        let mut again = first.clone();
        again.saved_at = first.saved_at + chrono::Duration::seconds(30);
        assert_eq!(drafts.write(None, &again).unwrap(), DraftWrite::SkippedUnchanged);
        assert_eq!(store.get_item("web-policy-details:new").unwrap(), raw_before);
    }

    #[test]
    fn relation_only_draft_is_not_empty() {
        let (drafts, _) = persistence(screens::interviewer_team());
        let draft = record(json!({"name": ""}), vec![4]);
        assert_eq!(drafts.write(Some(1), &draft).unwrap(), DraftWrite::Written);
    }

    #[test]
    fn clear_removes_the_draft() {
        let (drafts, store) = persistence(screens::interviewer_team());
        drafts.write(Some(9), &record(json!({"name": "Backend"}), vec![])).unwrap();
        drafts.clear(Some(9)).unwrap();
        assert!(drafts.read(Some(9)).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn undecodable_draft_reads_as_none() {
        let (drafts, store) = persistence(screens::interviewer_team());
        store.set_item("interviewer-teams-details:5", "{not json").unwrap();
        assert!(drafts.read(Some(5)).unwrap().is_none());
    }

    #[test]
    fn debouncer_only_releases_after_deadline() {
        let mut debouncer = DraftDebouncer::default();
        let start = Instant::now();
        debouncer.schedule(record(json!({"name": "a"}), vec![]), start);
        debouncer.schedule(record(json!({"name": "ab"}), vec![]), start + Duration::from_millis(100));

        assert!(debouncer.take_due(start + Duration::from_millis(200)).is_none());
        let due = debouncer
            .take_due(start + Duration::from_millis(250))
            .expect("draft should be due");
        assert_eq!(due.fields.get("name"), Some(&json!("ab")));
        assert!(!debouncer.has_pending());
    }

    #[test]
    fn debouncer_cancel_drops_pending() {
        let mut debouncer = DraftDebouncer::new(Duration::from_millis(10));
        debouncer.schedule(record(json!({"name": "a"}), vec![]), Instant::now());
        debouncer.cancel();
        assert!(debouncer.take().is_none());
    }
}
