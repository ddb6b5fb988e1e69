//! Cleanup stage: drops every record tied to the retired class.
//!
//! The class was decommissioned for good, so this guard lives permanently in
//! the full-sync path. It runs before normalization and never on local
//! mutations.

use crate::{Collection, Record, Snapshot};

/// Name of the permanently retired vocational class.
pub const RETIRED_CLASS: &str = "CNT K17A";

/// Fields that reference a class, per affected collection.
const CLASS_REFERENCES: [(Collection, &[&str]); 4] = [
    (Collection::VocationalClasses, &["className"]),
    (Collection::Students, &["class"]),
    (Collection::Attendance, &["classId", "className"]),
    (Collection::Behavior, &["classId"]),
];

/// Remove records referencing [`RETIRED_CLASS`]. Returns how many were removed.
pub fn remove_retired_class(snapshot: &mut Snapshot) -> usize {
    let mut removed = 0;
    for (collection, fields) in CLASS_REFERENCES {
        let records = snapshot.records_mut(collection);
        let before = records.len();
        records.retain(|record| !references_retired_class(record, fields));
        let dropped = before - records.len();
        if dropped > 0 {
            tracing::debug!(%collection, dropped, "removed records of retired class");
        }
        removed += dropped;
    }
    removed
}

fn references_retired_class(record: &Record, fields: &[&str]) -> bool {
    fields
        .iter()
        .any(|field| record.get_str(field) == Some(RETIRED_CLASS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<serde_json::Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::from_value(v).unwrap())
            .collect()
    }

    fn ids(snapshot: &Snapshot, collection: Collection) -> Vec<String> {
        snapshot
            .records(collection)
            .iter()
            .filter_map(Record::id)
            .collect()
    }

    #[test]
    fn drops_retired_class_everywhere() {
        let mut snapshot = Snapshot::from_collections([
            (
                Collection::VocationalClasses,
                records(vec![
                    json!({"id": "c-1", "className": "CNT K17A"}),
                    json!({"id": "c-2", "className": "CNT K18B"}),
                ]),
            ),
            (
                Collection::Students,
                records(vec![
                    json!({"id": "s-1", "class": "CNT K17A"}),
                    json!({"id": "s-2", "class": "CNT K18B"}),
                ]),
            ),
            (
                Collection::Attendance,
                records(vec![
                    json!({"id": "a-1", "classId": "CNT K17A"}),
                    json!({"id": "a-2", "className": "CNT K17A"}),
                    json!({"id": "a-3", "classId": "CNT K18B"}),
                ]),
            ),
            (
                Collection::Behavior,
                records(vec![
                    json!({"id": "b-1", "classId": "CNT K17A"}),
                    json!({"id": "b-2", "classId": "CNT K18B"}),
                ]),
            ),
        ]);

        assert_eq!(remove_retired_class(&mut snapshot), 5);
        assert_eq!(ids(&snapshot, Collection::VocationalClasses), ["c-2"]);
        assert_eq!(ids(&snapshot, Collection::Students), ["s-2"]);
        assert_eq!(ids(&snapshot, Collection::Attendance), ["a-3"]);
        assert_eq!(ids(&snapshot, Collection::Behavior), ["b-2"]);
    }

    #[test]
    fn other_collections_untouched() {
        // Only the four class-bearing collections are filtered.
        let mut snapshot = Snapshot::from_collections([(
            Collection::AcademicClasses,
            records(vec![json!({"id": "ac-1", "className": "CNT K17A"})]),
        )]);

        assert_eq!(remove_retired_class(&mut snapshot), 0);
        assert_eq!(snapshot.records(Collection::AcademicClasses).len(), 1);
    }

    #[test]
    fn behavior_matches_class_id_only() {
        let mut snapshot = Snapshot::from_collections([(
            Collection::Behavior,
            records(vec![json!({"id": "b-1", "className": "CNT K17A"})]),
        )]);

        assert_eq!(remove_retired_class(&mut snapshot), 0);
    }
}
