//! Remote record service: the backend of record.
//!
//! The engine talks to the backend only through [`RemoteService`]. Any
//! `Err` from these methods means the operation did not take effect remotely;
//! the engine does not distinguish further.

use crate::{Collection, Record, RecordId, RemoteError, Snapshot};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Collection fetched by the default connectivity probe.
pub const PROBE_COLLECTION: Collection = Collection::Users;

/// Per-collection operations against the backend.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Fetch every record of a collection.
    async fn fetch(&self, collection: Collection) -> Result<Vec<Record>, RemoteError>;

    /// Create a record.
    async fn create(&self, collection: Collection, record: &Record) -> Result<(), RemoteError>;

    /// Update a record, matched by identifier.
    async fn update(&self, collection: Collection, record: &Record) -> Result<(), RemoteError>;

    /// Delete a record by identifier.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError>;

    /// Connectivity check: a lightweight fetch of one collection.
    async fn probe(&self) -> Result<(), RemoteError> {
        self.fetch(PROBE_COLLECTION).await.map(|_| ())
    }
}

/// A call observed by [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Fetch(Collection),
    Create(Collection, RecordId),
    Update(Collection, RecordId),
    Delete(Collection, RecordId),
}

#[derive(Debug, Default)]
struct Faults {
    offline: bool,
    writes: bool,
    fetches: HashSet<Collection>,
    ids: HashSet<RecordId>,
}

/// In-process record service.
///
/// Keeps its records in a [`Snapshot`] and lets tests inject failures: the
/// whole service can go offline, all writes can be rejected, or only fetches
/// of some collections or writes touching some identifiers.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    data: Mutex<Snapshot>,
    faults: Mutex<Faults>,
    calls: Mutex<Vec<RemoteCall>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given records.
    pub fn with_data(data: Snapshot) -> Self {
        Self {
            data: Mutex::new(data),
            ..Self::default()
        }
    }

    /// Replace one collection's records on the service.
    pub fn put(&self, collection: Collection, records: Vec<Record>) {
        self.data.lock().replace(collection, records);
    }

    /// Current records of one collection on the service.
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.data.lock().records(collection).to_vec()
    }

    /// Fail every call as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().offline = offline;
    }

    /// Reject every create, update and delete.
    pub fn fail_writes(&self, fail: bool) {
        self.faults.lock().writes = fail;
    }

    /// Reject fetches of one collection.
    pub fn fail_fetch(&self, collection: Collection) {
        self.faults.lock().fetches.insert(collection);
    }

    /// Reject writes touching one identifier.
    pub fn fail_id(&self, id: impl Into<RecordId>) {
        self.faults.lock().ids.insert(id.into());
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    /// Number of fetches received so far, probes included.
    pub fn fetch_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, RemoteCall::Fetch(_)))
            .count()
    }

    fn check_write(&self, collection: Collection, id: &str) -> Result<(), RemoteError> {
        let faults = self.faults.lock();
        if faults.offline {
            return Err(RemoteError::Unreachable("service offline".into()));
        }
        if faults.writes || faults.ids.contains(id) {
            return Err(RemoteError::rejected(collection, format!("write of {id} refused")));
        }
        Ok(())
    }

    fn record_id(collection: Collection, record: &Record) -> Result<RecordId, RemoteError> {
        record
            .id()
            .ok_or_else(|| RemoteError::rejected(collection, "record has no id"))
    }
}

#[async_trait]
impl RemoteService for MemoryRemote {
    async fn fetch(&self, collection: Collection) -> Result<Vec<Record>, RemoteError> {
        self.calls.lock().push(RemoteCall::Fetch(collection));
        {
            let faults = self.faults.lock();
            if faults.offline {
                return Err(RemoteError::Unreachable("service offline".into()));
            }
            if faults.fetches.contains(&collection) {
                return Err(RemoteError::rejected(collection, "fetch refused"));
            }
        }
        Ok(self.records(collection))
    }

    async fn create(&self, collection: Collection, record: &Record) -> Result<(), RemoteError> {
        let id = Self::record_id(collection, record)?;
        self.calls
            .lock()
            .push(RemoteCall::Create(collection, id.clone()));
        self.check_write(collection, &id)?;

        let mut data = self.data.lock();
        let records = data.records_mut(collection);
        records.retain(|r| !r.has_id(&id));
        records.push(record.clone());
        Ok(())
    }

    async fn update(&self, collection: Collection, record: &Record) -> Result<(), RemoteError> {
        let id = Self::record_id(collection, record)?;
        self.calls
            .lock()
            .push(RemoteCall::Update(collection, id.clone()));
        self.check_write(collection, &id)?;

        let mut data = self.data.lock();
        match data.records_mut(collection).iter_mut().find(|r| r.has_id(&id)) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(RemoteError::rejected(collection, format!("{id} not found"))),
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError> {
        self.calls
            .lock()
            .push(RemoteCall::Delete(collection, id.to_string()));
        self.check_write(collection, id)?;

        self.data
            .lock()
            .records_mut(collection)
            .retain(|r| !r.has_id(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn writes_change_service_state() {
        let remote = MemoryRemote::new();
        let alice = record(json!({"id": "s-1", "name": "Alice"}));

        remote.create(Collection::Students, &alice).await.unwrap();
        remote
            .update(
                Collection::Students,
                &record(json!({"id": "s-1", "name": "Alice Nguyen"})),
            )
            .await
            .unwrap();
        assert_eq!(
            remote.records(Collection::Students)[0].get_str("name"),
            Some("Alice Nguyen")
        );

        remote.delete(Collection::Students, "s-1").await.unwrap();
        assert!(remote.records(Collection::Students).is_empty());
    }

    #[tokio::test]
    async fn update_of_unknown_record_is_rejected() {
        let remote = MemoryRemote::new();
        let err = remote
            .update(Collection::Teachers, &record(json!({"id": "t-9"})))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));
    }

    #[tokio::test]
    async fn probe_fetches_users() {
        let remote = MemoryRemote::new();
        remote.probe().await.unwrap();
        assert_eq!(remote.calls(), vec![RemoteCall::Fetch(Collection::Users)]);

        remote.set_offline(true);
        assert!(matches!(
            remote.probe().await,
            Err(RemoteError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn injected_faults() {
        let remote = MemoryRemote::new();
        remote.fail_fetch(Collection::Behavior);
        remote.fail_id("bad");

        assert!(remote.fetch(Collection::Behavior).await.is_err());
        assert!(remote.fetch(Collection::Attendance).await.is_ok());
        assert!(remote
            .create(Collection::Attendance, &record(json!({"id": "bad"})))
            .await
            .is_err());
        assert!(remote
            .create(Collection::Attendance, &record(json!({"id": "good"})))
            .await
            .is_ok());
        assert_eq!(remote.fetch_count(), 2);
    }
}
