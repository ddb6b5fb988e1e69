//! Snapshot: the complete state of all collections at a point in time.
//!
//! A snapshot is always fully formed. Every collection in
//! [`Collection::ALL`] is present, defaulting to an empty sequence, no matter
//! what it was built or decoded from.

use crate::{error::Result, Collection, Error, Record};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Ordered records for every collection.
///
/// Serializes as a JSON object of collection name to array, which is the
/// persisted cache format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    collections: BTreeMap<Collection, Vec<Record>>,
}

impl Snapshot {
    /// Create a snapshot with every collection empty.
    pub fn new() -> Self {
        Self {
            collections: Collection::ALL
                .into_iter()
                .map(|c| (c, Vec::new()))
                .collect(),
        }
    }

    /// Build a snapshot from per-collection records. Collections not named
    /// are filled in empty.
    pub fn from_collections(
        collections: impl IntoIterator<Item = (Collection, Vec<Record>)>,
    ) -> Self {
        let mut snapshot = Self::new();
        for (collection, records) in collections {
            snapshot.collections.insert(collection, records);
        }
        snapshot
    }

    /// Records of a collection, in order.
    pub fn records(&self, collection: Collection) -> &[Record] {
        self.collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mutable access to a collection's records.
    pub fn records_mut(&mut self, collection: Collection) -> &mut Vec<Record> {
        self.collections.entry(collection).or_default()
    }

    /// Replace a collection wholesale, returning the previous records.
    pub fn replace(&mut self, collection: Collection, records: Vec<Record>) -> Vec<Record> {
        self.collections
            .insert(collection, records)
            .unwrap_or_default()
    }

    /// Iterate over every collection and its records.
    pub fn iter(&self) -> impl Iterator<Item = (Collection, &[Record])> {
        self.collections.iter().map(|(c, r)| (*c, r.as_slice()))
    }

    /// Count records across all collections.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Names no longer tracked are dropped rather than failing the load.
        let raw = BTreeMap::<String, Vec<Record>>::deserialize(deserializer)?;
        Ok(Self::from_collections(raw.into_iter().filter_map(
            |(name, records)| name.parse::<Collection>().ok().map(|c| (c, records)),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn new_snapshot_has_every_collection() {
        let snapshot = Snapshot::new();
        assert_eq!(snapshot.iter().count(), Collection::ALL.len());
        assert!(snapshot.iter().all(|(_, records)| records.is_empty()));
        assert_eq!(snapshot.record_count(), 0);
    }

    #[test]
    fn from_collections_fills_missing() {
        let snapshot = Snapshot::from_collections([(
            Collection::Students,
            vec![record(json!({"id": "s-1"}))],
        )]);

        assert_eq!(snapshot.records(Collection::Students).len(), 1);
        assert!(snapshot.records(Collection::Teachers).is_empty());
        assert_eq!(snapshot.iter().count(), Collection::ALL.len());
    }

    #[test]
    fn replace_returns_previous() {
        let mut snapshot = Snapshot::new();
        snapshot.replace(Collection::Users, vec![record(json!({"id": "u-1"}))]);

        let previous = snapshot.replace(Collection::Users, Vec::new());
        assert_eq!(previous.len(), 1);
        assert!(snapshot.records(Collection::Users).is_empty());
    }

    #[test]
    fn decode_tolerates_partial_cache() {
        let json = r#"{
            "Students": [{"id": "s-1", "class": "CNT K18B"}],
            "RetiredTable": [{"id": "x"}]
        }"#;

        let snapshot = Snapshot::from_json(json).unwrap();
        assert_eq!(snapshot.records(Collection::Students).len(), 1);
        assert!(snapshot.records(Collection::Behavior).is_empty());
        assert_eq!(snapshot.iter().count(), Collection::ALL.len());
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(matches!(
            Snapshot::from_json("not json"),
            Err(Error::InvalidSnapshot(_))
        ));
        assert!(matches!(
            Snapshot::from_json(r#"{"Students": 3}"#),
            Err(Error::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn json_roundtrip_preserves_order() {
        let snapshot = Snapshot::from_collections([(
            Collection::Attendance,
            vec![
                record(json!({"id": "b", "present": true})),
                record(json!({"id": "a", "present": false})),
            ],
        )]);

        let restored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(
            restored.records(Collection::Attendance)[0].id().as_deref(),
            Some("b")
        );
    }
}
