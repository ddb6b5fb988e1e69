//! Observable engine state and the full-sync state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Connectivity and sync status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Outcome of the latest probe or full sync.
    pub is_online: bool,
    /// True for the whole duration of a full sync.
    pub is_syncing: bool,
    /// Time of the latest successful full sync.
    pub last_synced: Option<DateTime<Utc>>,
}

impl Default for SyncState {
    fn default() -> Self {
        // Assume online until the first probe says otherwise.
        Self {
            is_online: true,
            is_syncing: false,
            last_synced: None,
        }
    }
}

/// Phase of the full-sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncPhase {
    Idle = 0,
    Syncing = 1,
}

/// Guards full sync against re-entry.
///
/// Entry is a single compare-and-swap from `Idle` to `Syncing`; the returned
/// permit moves back to `Idle` when dropped.
#[derive(Debug)]
pub struct SyncGate {
    phase: AtomicU8,
}

impl SyncGate {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(SyncPhase::Idle as u8),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SyncPhase {
        if self.phase.load(Ordering::Acquire) == SyncPhase::Syncing as u8 {
            SyncPhase::Syncing
        } else {
            SyncPhase::Idle
        }
    }

    /// Enter `Syncing`, or `None` if a sync is already running.
    pub fn try_enter(&self) -> Option<SyncPermit<'_>> {
        self.phase
            .compare_exchange(
                SyncPhase::Idle as u8,
                SyncPhase::Syncing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| SyncPermit { gate: self })
    }
}

impl Default for SyncGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of being the one running full sync.
#[derive(Debug)]
pub struct SyncPermit<'a> {
    gate: &'a SyncGate,
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.gate
            .phase
            .store(SyncPhase::Idle as u8, Ordering::Release);
    }
}
