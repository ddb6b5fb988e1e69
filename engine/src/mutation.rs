//! Optimistic single-record mutations.
//!
//! A mutation is committed to the cache before the remote service hears of
//! it. The remote write then runs in the background; if it is refused, the
//! cache is rolled back according to the configured [`RollbackPolicy`] and a
//! notice is raised.

use crate::{Collection, Notice, Record, RecordId, RollbackPolicy, SyncEngine};
use tokio::task::JoinHandle;

/// How a background write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote service accepted the write; the optimistic state stands.
    Confirmed,
    /// The remote service refused the write; the cache was rolled back.
    RolledBack,
    /// The record had no identifier; nothing was changed or sent.
    Rejected,
}

impl SyncEngine {
    /// Save one record: upsert by identifier when `is_update`, otherwise
    /// append it, dropping any record with the same identifier first.
    ///
    /// Returns once the cache is updated; the handle resolves when the remote
    /// write has settled.
    pub fn save_record(
        &self,
        collection: Collection,
        record: Record,
        is_update: bool,
    ) -> JoinHandle<WriteOutcome> {
        let Some(id) = record.id() else {
            tracing::warn!(%collection, "refusing to save a record without an id");
            return tokio::spawn(async { WriteOutcome::Rejected });
        };

        let prior = self.mutate_collection(collection, |records| {
            let prior = records.clone();
            if is_update {
                upsert(records, &id, record.clone());
            } else {
                records.retain(|r| !r.has_id(&id));
                records.push(record.clone());
            }
            prior
        });

        let engine = self.clone();
        tokio::spawn(async move {
            let remote = &engine.inner.remote;
            let result = if is_update {
                remote.update(collection, &record).await
            } else {
                remote.create(collection, &record).await
            };

            match result {
                Ok(()) => {
                    tracing::debug!(%collection, %id, "save confirmed");
                    WriteOutcome::Confirmed
                }
                Err(e) => {
                    tracing::warn!(%collection, %id, error = %e, "save failed, rolling back");
                    engine.roll_back(collection, &id, prior);
                    engine.notify(Notice::SaveFailed { collection, id });
                    WriteOutcome::RolledBack
                }
            }
        })
    }

    /// Remove one record by identifier.
    ///
    /// Returns once the cache is updated; the handle resolves when the remote
    /// delete has settled.
    pub fn remove_record(
        &self,
        collection: Collection,
        id: impl Into<RecordId>,
    ) -> JoinHandle<WriteOutcome> {
        let id = id.into();
        let prior = self.mutate_collection(collection, |records| {
            let prior = records.clone();
            records.retain(|r| !r.has_id(&id));
            prior
        });

        let engine = self.clone();
        tokio::spawn(async move {
            match engine.inner.remote.delete(collection, &id).await {
                Ok(()) => {
                    tracing::debug!(%collection, %id, "delete confirmed");
                    WriteOutcome::Confirmed
                }
                Err(e) => {
                    tracing::warn!(%collection, %id, error = %e, "delete failed, rolling back");
                    engine.roll_back(collection, &id, prior);
                    engine.notify(Notice::DeleteFailed { collection, id });
                    WriteOutcome::RolledBack
                }
            }
        })
    }

    fn roll_back(&self, collection: Collection, id: &str, prior: Vec<Record>) {
        match self.config().rollback {
            RollbackPolicy::Collection => {
                self.mutate_collection(collection, |records| *records = prior);
            }
            RollbackPolicy::Record => {
                self.mutate_collection(collection, |records| restore_record(records, id, &prior));
            }
        }
    }
}

/// Replace the record with `id` in place, or append it.
fn upsert(records: &mut Vec<Record>, id: &str, record: Record) {
    match records.iter_mut().find(|r| r.has_id(id)) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Put the record with `id` back to how it was in `prior`, leaving every
/// other record alone.
fn restore_record(records: &mut Vec<Record>, id: &str, prior: &[Record]) {
    match prior.iter().position(|r| r.has_id(id)) {
        Some(position) => {
            let original = prior[position].clone();
            match records.iter_mut().find(|r| r.has_id(id)) {
                Some(current) => *current = original,
                None => records.insert(position.min(records.len()), original),
            }
        }
        None => records.retain(|r| !r.has_id(id)),
    }
}
