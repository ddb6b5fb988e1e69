//! User-visible failure notices.
//!
//! Remote write failures are reported through a [`Notifier`], the seam where
//! a UI shows its blocking alert. Connectivity problems are never noticed
//! here; they only show up in [`SyncState`](crate::SyncState).

use crate::{Collection, RecordId};
use std::fmt;

/// A failure the user must be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A create or update was refused and the collection was rolled back.
    SaveFailed { collection: Collection, id: RecordId },
    /// A delete was refused and the collection was rolled back.
    DeleteFailed { collection: Collection, id: RecordId },
    /// Some items of a batch were not written remotely. The local merge stays.
    BatchFailed {
        collection: Collection,
        failed: usize,
        total: usize,
    },
}

impl Notice {
    pub fn collection(&self) -> Collection {
        match self {
            Notice::SaveFailed { collection, .. }
            | Notice::DeleteFailed { collection, .. }
            | Notice::BatchFailed { collection, .. } => *collection,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::SaveFailed { collection, id } => write!(
                f,
                "Connection error: {collection} record {id} was not saved to the server."
            ),
            Notice::DeleteFailed { collection, id } => write!(
                f,
                "Connection error: {collection} record {id} could not be deleted on the server."
            ),
            Notice::BatchFailed {
                collection,
                failed,
                total,
            } => write!(
                f,
                "Warning: {failed} of {total} {collection} records failed to sync to the server. \
                 Please check the connection."
            ),
        }
    }
}

/// Receives failure notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        tracing::warn!(collection = %notice.collection(), "{notice}");
    }
}

impl<F> Notifier for F
where
    F: Fn(&Notice) + Send + Sync,
{
    fn notify(&self, notice: &Notice) {
        self(notice)
    }
}
