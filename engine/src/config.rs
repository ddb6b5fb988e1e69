//! Engine configuration.

use std::time::Duration;

/// Default delay between engine start and the first full sync.
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(1000);

/// Default pause between consecutive remote writes of a batch.
pub const DEFAULT_BATCH_ITEM_DELAY: Duration = Duration::from_millis(100);

/// What a failed single-record write restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Restore the whole collection as it was when the write started.
    ///
    /// A concurrent successful mutation to the same collection that
    /// committed in between is discarded along with the failed one.
    #[default]
    Collection,
    /// Restore only the record the failed write touched.
    Record,
}

/// Tunables of a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay between `start()` and the automatic full sync.
    pub startup_delay: Duration,
    /// Pause after each remote write of a batch.
    pub batch_item_delay: Duration,
    /// Rollback granularity of the optimistic pipeline.
    pub rollback: RollbackPolicy,
}

impl EngineConfig {
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn with_batch_item_delay(mut self, delay: Duration) -> Self {
        self.batch_item_delay = delay;
        self
    }

    pub fn with_rollback(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            startup_delay: DEFAULT_STARTUP_DELAY,
            batch_item_delay: DEFAULT_BATCH_ITEM_DELAY,
            rollback: RollbackPolicy::default(),
        }
    }
}
