//! # Roster Engine
//!
//! An offline-first cache and sync engine for school records.
//!
//! The remote record service is the source of truth, but it may be slow,
//! unreachable or rate-limited. This crate keeps a durable local snapshot of
//! every collection so the application keeps working, and keeps it mutable,
//! while the service is away.
//!
//! ## Core Concepts
//!
//! ### Snapshot
//!
//! A [`Snapshot`] maps each of the ten fixed [`Collection`]s to an ordered
//! list of [`Record`]s. Records are opaque field bags keyed by an `id`.
//! A snapshot is always fully formed: every collection is present.
//!
//! ### Full sync
//!
//! [`SyncEngine::sync_now`] probes connectivity, fetches every collection
//! concurrently, runs the [`cleanup`] and [`normalize`] stages, and swaps the
//! result in atomically. A fetch that fails leaves its collection empty for
//! that cycle. Full sync never runs twice at once.
//!
//! ### Optimistic mutations
//!
//! [`SyncEngine::save_record`] and [`SyncEngine::remove_record`] change the
//! cache immediately and write to the remote service in the background,
//! rolling back and raising a [`Notice`] if the write is refused.
//!
//! ### Batches
//!
//! [`SyncEngine::save_batch`] merges many records at once and pushes them one
//! at a time with a pause in between. Refused items are reported in a single
//! notice but never rolled back.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use roster_engine::{Collection, MemoryKv, MemoryRemote, Record, SyncEngine, SyncOutcome};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let remote = Arc::new(MemoryRemote::new());
//! remote.put(Collection::Teachers, vec![Record::new("t-1").with("name", "Lan")]);
//!
//! let engine = SyncEngine::new(remote, Arc::new(MemoryKv::new()));
//! assert!(matches!(engine.sync_now().await, SyncOutcome::Completed { .. }));
//! assert_eq!(engine.records(Collection::Teachers).len(), 1);
//!
//! let student = Record::new("s-1").with("class", "CNT K18B");
//! engine.save_record(Collection::Students, student, false).await.unwrap();
//! assert_eq!(engine.records(Collection::Students).len(), 1);
//! # }
//! ```
//!
//! ## Persistence
//!
//! The engine writes through a [`KeyValueStore`]: [`FileKv`] for a directory
//! on disk, [`MemoryKv`] for tests. Every accepted change is persisted before
//! the call that made it returns, so a restart resumes from the latest local
//! state.

pub mod batch;
pub mod cache;
pub mod cleanup;
pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod mutation;
pub mod normalize;
pub mod notice;
pub mod record;
pub mod remote;
pub mod snapshot;
pub mod state;

// Re-export main types at crate root
pub use batch::BatchOutcome;
pub use cache::{CacheStore, FileKv, KeyValueStore, MemoryKv, LAST_SYNCED_KEY, SNAPSHOT_KEY};
pub use collection::Collection;
pub use config::{EngineConfig, RollbackPolicy};
pub use engine::{EngineBuilder, SyncEngine, SyncOutcome};
pub use error::{Error, RemoteError};
pub use events::{EngineEvent, ListenerId};
pub use mutation::WriteOutcome;
pub use notice::{LogNotifier, Notice, Notifier};
pub use record::Record;
pub use remote::{MemoryRemote, RemoteCall, RemoteService};
pub use snapshot::Snapshot;
pub use state::{SyncPhase, SyncState};

/// Record identifier.
pub type RecordId = String;
