//! Collaborator interfaces consumed by the controller.
//!
//! Adapters live in other crates: `hrdesk-client` talks to the HTTP API,
//! `hrdesk-store` persists drafts to disk, `hrdesk-events` fans notifications
//! out to subscribers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, FieldMap};

/// An entity as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDto {
    pub id: DbId,
    pub fields: FieldMap,
    #[serde(default)]
    pub relation_ids: Vec<DbId>,
}

/// Body of a create or update call.
///
/// `relation_ids` is only set on create; updates sync relations through
/// individual add/remove calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPayload {
    pub fields: FieldMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_ids: Option<Vec<DbId>>,
}

/// One selectable related record, e.g. an active interviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: DbId,
    pub label: String,
}

/// Remote CRUD for one entity type and its relation collection.
#[async_trait]
pub trait RemoteEntityStore: Send + Sync {
    async fn fetch_by_id(&self, id: DbId) -> Result<EntityDto, CoreError>;

    async fn update(&self, id: DbId, payload: &EntityPayload) -> Result<EntityDto, CoreError>;

    async fn create(&self, payload: &EntityPayload) -> Result<EntityDto, CoreError>;

    async fn add_relation(&self, entity_id: DbId, child_id: DbId) -> Result<(), CoreError>;

    async fn remove_relation(&self, entity_id: DbId, child_id: DbId) -> Result<(), CoreError>;
}

/// Source of the records a relation selection may reference.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_reference_items(&self) -> Result<Vec<ReferenceItem>, CoreError>;
}

/// Session-scoped string key-value store holding drafts.
pub trait DraftStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError>;

    fn remove_item(&self, key: &str) -> Result<(), CoreError>;
}

/// User-visible feedback sink.
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);

    fn success(&self, message: &str);
}

/// [`Notifier`] that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn error(&self, message: &str) {
        tracing::error!(%message, "User notification");
    }

    fn success(&self, message: &str) {
        tracing::info!(%message, "User notification");
    }
}
