//! Load sequencing: reference list, then entity, then draft.
//!
//! A draft may be days old. Relation ids it selects are filtered down to the
//! ids still present in the reference list (e.g. interviewers that are still
//! active) before the draft is applied, so a stale id never reaches a save
//! payload.

use std::collections::HashSet;

use crate::draft::{DraftPersistence, DraftRecord};
use crate::error::CoreError;
use crate::ports::{EntityDto, ReferenceItem, ReferenceSource, RemoteEntityStore};
use crate::types::DbId;

/// Everything gathered for one screen load.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    /// The fetched entity, or `None` for a new entity.
    pub entity: Option<EntityDto>,
    /// The stored draft with stale relation ids already removed.
    pub draft: Option<DraftRecord>,
    /// Relation ids dropped from the draft because they are no longer valid.
    pub dropped_relation_ids: Vec<DbId>,
    /// The reference list, if it was fetched.
    pub references: Option<Vec<ReferenceItem>>,
}

/// Keep only `ids` present in `valid`, preserving order.
///
/// Returns `(kept, dropped)`.
pub fn filter_relation_ids(ids: &[DbId], valid: &HashSet<DbId>) -> (Vec<DbId>, Vec<DbId>) {
    ids.iter().copied().partition(|id| valid.contains(id))
}

/// Run the load sequence for one entity.
///
/// Entity fetch and draft read failures are returned as errors. A reference
/// fetch failure is logged and the draft's relation ids are then checked
/// against the fetched entity's own relation ids instead; with no entity
/// either, the draft's selection is dropped.
pub async fn restore(
    entity_id: Option<DbId>,
    store: &dyn RemoteEntityStore,
    references: Option<&dyn ReferenceSource>,
    drafts: &DraftPersistence,
) -> Result<Restored, CoreError> {
    let reference_items = match references {
        Some(source) => match source.fetch_reference_items().await {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch reference list for draft validation");
                None
            }
        },
        None => None,
    };

    let entity = match entity_id {
        Some(id) => Some(store.fetch_by_id(id).await?),
        None => None,
    };

    let mut draft = drafts.read(entity_id)?;
    let mut dropped = Vec::new();

    if let Some(record) = draft.as_mut() {
        if !record.relation_ids.is_empty() {
            let valid: HashSet<DbId> = match (&reference_items, &entity) {
                (Some(items), _) => items.iter().map(|item| item.id).collect(),
                (None, Some(dto)) => dto.relation_ids.iter().copied().collect(),
                (None, None) => HashSet::new(),
            };
            let (kept, stale) = filter_relation_ids(&record.relation_ids, &valid);
            if !stale.is_empty() {
                tracing::info!(
                    entity_id = ?entity_id,
                    stale = ?stale,
                    "Dropped stale relation ids from restored draft",
                );
            }
            record.relation_ids = kept;
            dropped = stale;
        }
    }

    Ok(Restored {
        entity,
        draft,
        dropped_relation_ids: dropped,
        references: reference_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_keeps_order_and_reports_dropped() {
        let valid: HashSet<DbId> = [1, 2, 5].into_iter().collect();
        let (kept, dropped) = filter_relation_ids(&[5, 3, 1, 4], &valid);
        assert_eq!(kept, vec![5, 1]);
        assert_eq!(dropped, vec![3, 4]);
    }

    #[test]
    fn filter_against_empty_set_drops_everything() {
        let (kept, dropped) = filter_relation_ids(&[1, 2], &HashSet::new());
        assert!(kept.is_empty());
        assert_eq!(dropped, vec![1, 2]);
    }
}
