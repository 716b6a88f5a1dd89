//! Many-to-many relation diffing and sync.
//!
//! On save the controller compares the persisted relation ids with the
//! current selection and issues one add or remove call per difference. The
//! calls run as one unordered concurrent batch; a failure of one call does
//! not cancel or roll back the others.

use std::collections::HashSet;

use futures::future::join_all;
use serde::Serialize;

use crate::ports::RemoteEntityStore;
use crate::types::DbId;

/// Ids to add and remove to turn `previous` into `selected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationDiff {
    pub to_add: Vec<DbId>,
    pub to_remove: Vec<DbId>,
}

impl RelationDiff {
    /// `to_add = selected - previous`, `to_remove = previous - selected`.
    ///
    /// Duplicates are collapsed; `to_add` keeps selection order and
    /// `to_remove` keeps persisted order.
    pub fn compute(previous: &[DbId], selected: &[DbId]) -> Self {
        let previous_set: HashSet<DbId> = previous.iter().copied().collect();
        let selected_set: HashSet<DbId> = selected.iter().copied().collect();

        Self {
            to_add: unique_missing(selected, &previous_set),
            to_remove: unique_missing(previous, &selected_set),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

fn unique_missing(ids: &[DbId], other: &HashSet<DbId>) -> Vec<DbId> {
    let mut seen = HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| !other.contains(id) && seen.insert(*id))
        .collect()
}

/// Direction of one relation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOp {
    Add,
    Remove,
}

/// A relation call that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationFailure {
    pub op: RelationOp,
    pub child_id: DbId,
    pub message: String,
}

/// Outcome of a relation sync batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationSyncReport {
    pub added: Vec<DbId>,
    pub removed: Vec<DbId>,
    pub failures: Vec<RelationFailure>,
}

impl RelationSyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The relation ids the server holds after this batch, given the ids it
    /// held before.
    ///
    /// Only successful calls move the state; failed ones leave it where it
    /// was, so the next diff replays them.
    pub fn apply_to(&self, previous: &[DbId]) -> Vec<DbId> {
        let removed: HashSet<DbId> = self.removed.iter().copied().collect();
        let mut ids: Vec<DbId> = previous
            .iter()
            .copied()
            .filter(|id| !removed.contains(id))
            .collect();
        for id in &self.added {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Issue every add and remove call in `diff` concurrently.
pub async fn sync_relations(
    store: &dyn RemoteEntityStore,
    entity_id: DbId,
    diff: &RelationDiff,
) -> RelationSyncReport {
    let adds = diff.to_add.iter().map(move |&child_id| async move {
        (
            RelationOp::Add,
            child_id,
            store.add_relation(entity_id, child_id).await,
        )
    });
    let removes = diff.to_remove.iter().map(move |&child_id| async move {
        (
            RelationOp::Remove,
            child_id,
            store.remove_relation(entity_id, child_id).await,
        )
    });

    let (add_results, remove_results) = futures::join!(join_all(adds), join_all(removes));

    let mut report = RelationSyncReport::default();
    for (op, child_id, result) in add_results.into_iter().chain(remove_results) {
        match (op, result) {
            (RelationOp::Add, Ok(())) => report.added.push(child_id),
            (RelationOp::Remove, Ok(())) => report.removed.push(child_id),
            (op, Err(e)) => {
                tracing::warn!(
                    entity_id,
                    child_id,
                    ?op,
                    error = %e,
                    "Relation sync call failed",
                );
                report.failures.push(RelationFailure {
                    op,
                    child_id,
                    message: e.to_string(),
                });
            }
        }
    }
    report
}
