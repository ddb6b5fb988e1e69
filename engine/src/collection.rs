//! The fixed set of record collections tracked by the engine.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the ten named buckets of records.
///
/// The serialized name is the one used by the remote service and the
/// persisted cache, e.g. `"VocationalClasses"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Collection {
    Users,
    Teachers,
    Students,
    VocationalClasses,
    AcademicClasses,
    Departments,
    Vocations,
    Attendance,
    Behavior,
    SystemConfig,
}

impl Collection {
    /// Every collection, in fetch order.
    pub const ALL: [Collection; 10] = [
        Collection::Users,
        Collection::Teachers,
        Collection::Students,
        Collection::VocationalClasses,
        Collection::AcademicClasses,
        Collection::Departments,
        Collection::Vocations,
        Collection::Attendance,
        Collection::Behavior,
        Collection::SystemConfig,
    ];

    /// Wire and storage name of the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "Users",
            Collection::Teachers => "Teachers",
            Collection::Students => "Students",
            Collection::VocationalClasses => "VocationalClasses",
            Collection::AcademicClasses => "AcademicClasses",
            Collection::Departments => "Departments",
            Collection::Vocations => "Vocations",
            Collection::Attendance => "Attendance",
            Collection::Behavior => "Behavior",
            Collection::SystemConfig => "SystemConfig",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}
