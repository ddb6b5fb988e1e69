//! Normalization stage for the subject-teacher list of class records.
//!
//! The backend stores `subjectTeacherIds` as a spreadsheet cell, so it can
//! arrive either as a real array or as the JSON text of one. After this stage
//! the field is always an array.

use crate::{Collection, Record, Snapshot};
use serde_json::Value;

/// Field holding the list of subject teacher identifiers.
pub const TEACHER_IDS_FIELD: &str = "subjectTeacherIds";

/// Collections whose records carry [`TEACHER_IDS_FIELD`].
pub const CLASS_COLLECTIONS: [Collection; 2] =
    [Collection::VocationalClasses, Collection::AcademicClasses];

/// Normalize the teacher-id field of every class record in the snapshot.
pub fn normalize_teacher_ids(snapshot: &mut Snapshot) {
    for collection in CLASS_COLLECTIONS {
        for record in snapshot.records_mut(collection) {
            normalize_record(record);
        }
    }
}

/// Normalize the teacher-id field of one record.
pub fn normalize_record(record: &mut Record) {
    let ids = decode_teacher_ids(record.get(TEACHER_IDS_FIELD));
    record.set(TEACHER_IDS_FIELD, Value::Array(ids));
}

/// Decode a raw field value into a list.
///
/// Only text that looks like JSON (starts with `[` or `{`) is decoded.
/// Anything that is not an array afterwards becomes empty.
pub fn decode_teacher_ids(raw: Option<&Value>) -> Vec<Value> {
    match raw {
        Some(Value::Array(ids)) => ids.clone(),
        Some(Value::String(text)) if text.starts_with('[') || text.starts_with('{') => {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(ids)) => ids,
                Ok(_) => Vec::new(),
                Err(e) => {
                    tracing::debug!(error = %e, "undecodable teacher id list");
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    }
}
