//! Batch reconciliation: merge many records at once, then push them one by
//! one.
//!
//! Unlike single-record saves, a refused item is never rolled back. The merged
//! cache stays as it is and one aggregate notice is raised at the end.

use crate::{Collection, Notice, Record, RecordId, SyncEngine};
use std::collections::{HashMap, HashSet};
use tokio::task::JoinHandle;

/// How the background half of a batch ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items the remote service accepted.
    pub written: usize,
    /// Identifiers of items the remote service refused.
    pub failed: Vec<RecordId>,
    /// Items dropped up front for lack of an identifier.
    pub skipped: usize,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0
    }
}

impl SyncEngine {
    /// Merge `items` into a collection by identifier (last write wins), then
    /// create or update each one remotely, in order, pausing between writes.
    ///
    /// An item is an update when its identifier was already cached before the
    /// merge, and a create otherwise.
    pub fn save_batch(&self, collection: Collection, items: Vec<Record>) -> JoinHandle<BatchOutcome> {
        let total = items.len();
        let items: Vec<(RecordId, Record)> = items
            .into_iter()
            .filter_map(|item| item.id().map(|id| (id, item)))
            .collect();
        let skipped = total - items.len();
        if skipped > 0 {
            tracing::warn!(%collection, skipped, "skipping batch items without an id");
        }

        let known: HashSet<RecordId> = self.mutate_collection(collection, |records| {
            let known: HashSet<RecordId> = records.iter().filter_map(Record::id).collect();
            merge_by_id(records, &items);
            known
        });

        let engine = self.clone();
        tokio::spawn(async move {
            let remote = &engine.inner.remote;
            let delay = engine.config().batch_item_delay;
            let mut outcome = BatchOutcome {
                skipped,
                ..BatchOutcome::default()
            };

            for (id, item) in &items {
                let result = if known.contains(id) {
                    remote.update(collection, item).await
                } else {
                    remote.create(collection, item).await
                };
                match result {
                    Ok(()) => outcome.written += 1,
                    Err(e) => {
                        tracing::warn!(%collection, %id, error = %e, "batch item failed");
                        outcome.failed.push(id.clone());
                    }
                }
                tokio::time::sleep(delay).await;
            }

            if !outcome.failed.is_empty() {
                engine.notify(Notice::BatchFailed {
                    collection,
                    failed: outcome.failed.len(),
                    total: items.len(),
                });
            }
            tracing::debug!(%collection, written = outcome.written, "batch settled");
            outcome
        })
    }
}

/// Merge `items` into `records`: an item whose identifier is already present
/// replaces that record in place, any other item is appended.
pub(crate) fn merge_by_id(records: &mut Vec<Record>, items: &[(RecordId, Record)]) {
    let mut positions: HashMap<RecordId, usize> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.id().map(|id| (id, i)))
        .collect();

    for (id, item) in items {
        match positions.get(id) {
            Some(&i) => records[i] = item.clone(),
            None => {
                positions.insert(id.clone(), records.len());
                records.push(item.clone());
            }
        }
    }
}
