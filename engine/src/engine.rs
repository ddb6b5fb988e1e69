//! SyncEngine - the offline-first cache and its synchronization with the
//! remote record service.
//!
//! The engine owns one in-memory [`Snapshot`] plus the [`SyncState`] flags,
//! mirrored to a persistent [`CacheStore`]. Full syncs replace the snapshot
//! wholesale; the mutation pipelines (see `mutation.rs` and `batch.rs`)
//! replace one collection at a time. Every write is a single replace under
//! the state lock, followed by a persist, so no partial write is ever
//! observable.

use crate::cache::{CacheStore, KeyValueStore};
use crate::events::{EngineEvent, EventBus, ListenerId};
use crate::notice::{LogNotifier, Notice, Notifier};
use crate::remote::RemoteService;
use crate::state::{SyncGate, SyncPhase};
use crate::{
    cleanup, error::Result, normalize, Collection, EngineConfig, Error, Record, Snapshot,
    SyncState,
};
use chrono::{DateTime, SubsecRound, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// How a call to [`SyncEngine::sync_now`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The snapshot was replaced with freshly fetched data.
    Completed {
        at: DateTime<Utc>,
        records: usize,
    },
    /// The connectivity probe failed; nothing was touched.
    Offline,
    /// Another full sync was in flight; this call did nothing.
    AlreadyRunning,
    /// The sync pipeline broke unexpectedly; the previous snapshot was kept.
    Failed,
}

struct EngineState {
    status: SyncState,
    data: Snapshot,
}

pub(crate) struct Inner {
    pub(crate) remote: Arc<dyn RemoteService>,
    config: EngineConfig,
    cache: CacheStore,
    notifier: Arc<dyn Notifier>,
    state: Mutex<EngineState>,
    gate: SyncGate,
    events: EventBus,
}

/// The offline-first sync engine.
///
/// Cheap to clone; all clones share the same state. Operations that do
/// background work spawn onto the ambient Tokio runtime and must be called
/// from within one.
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) inner: Arc<Inner>,
}

/// Builder for [`SyncEngine`].
pub struct EngineBuilder {
    remote: Arc<dyn RemoteService>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Receive failure notices with `notifier` instead of just logging them.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine, resuming from whatever the cache store holds.
    pub fn build(self) -> SyncEngine {
        let cache = CacheStore::new(self.store);
        let data = cache.load_snapshot().unwrap_or_default();
        let last_synced = cache.load_last_synced();
        tracing::debug!(
            records = data.record_count(),
            last_synced = ?last_synced,
            "loaded cached snapshot"
        );

        SyncEngine {
            inner: Arc::new(Inner {
                remote: self.remote,
                config: self.config,
                cache,
                notifier: self.notifier,
                state: Mutex::new(EngineState {
                    status: SyncState {
                        last_synced,
                        ..SyncState::default()
                    },
                    data,
                }),
                gate: SyncGate::new(),
                events: EventBus::new(),
            }),
        }
    }
}

impl SyncEngine {
    /// Start building an engine over a remote service and a durable store.
    pub fn builder(remote: Arc<dyn RemoteService>, store: Arc<dyn KeyValueStore>) -> EngineBuilder {
        EngineBuilder {
            remote,
            store,
            notifier: Arc::new(LogNotifier),
            config: EngineConfig::default(),
        }
    }

    /// Build an engine with the default configuration.
    pub fn new(remote: Arc<dyn RemoteService>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::builder(remote, store).build()
    }

    // ------------------------------------------------------------------
    // Reading state
    // ------------------------------------------------------------------

    /// Current status flags.
    pub fn state(&self) -> SyncState {
        self.inner.state.lock().status
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online
    }

    pub fn is_syncing(&self) -> bool {
        self.state().is_syncing
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.state().last_synced
    }

    /// Phase of the full-sync state machine.
    pub fn phase(&self) -> SyncPhase {
        self.inner.gate.phase()
    }

    /// A copy of the whole snapshot.
    pub fn data(&self) -> Snapshot {
        self.inner.state.lock().data.clone()
    }

    /// A copy of one collection.
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.inner.state.lock().data.records(collection).to_vec()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Call `listener` after every committed state transition.
    pub fn subscribe(&self, listener: impl Fn(&EngineEvent) + Send + Sync + 'static) -> ListenerId {
        self.inner.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Connectivity and full sync
    // ------------------------------------------------------------------

    /// Probe the remote service and record the result in `is_online`.
    pub async fn check_connection(&self) -> bool {
        let online = match self.inner.remote.probe().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "connectivity probe failed");
                false
            }
        };
        self.update_status(|status| status.is_online = online);
        online
    }

    /// Run one full sync, unless one is already in flight.
    pub async fn sync_now(&self) -> SyncOutcome {
        let Some(_permit) = self.inner.gate.try_enter() else {
            tracing::debug!("full sync already in flight, skipping");
            return SyncOutcome::AlreadyRunning;
        };
        let _syncing = SyncingFlag::raise(self);
        self.full_sync().await
    }

    /// Probe connectivity now and run the first full sync after the
    /// configured startup delay.
    pub fn start(&self) -> JoinHandle<SyncOutcome> {
        let engine = self.clone();
        tokio::spawn(async move {
            let delayed_sync = async {
                tokio::time::sleep(engine.config().startup_delay).await;
                engine.sync_now().await
            };
            let (_, outcome) = tokio::join!(engine.check_connection(), delayed_sync);
            outcome
        })
    }

    async fn full_sync(&self) -> SyncOutcome {
        if !self.check_connection().await {
            tracing::info!("remote unreachable, keeping cached data");
            return SyncOutcome::Offline;
        }

        let mut snapshot = match self.fetch_all().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "full sync failed");
                self.update_status(|status| status.is_online = false);
                return SyncOutcome::Failed;
            }
        };

        let removed = cleanup::remove_retired_class(&mut snapshot);
        normalize::normalize_teacher_ids(&mut snapshot);

        let records = snapshot.record_count();
        let at = self.commit_snapshot(snapshot);
        tracing::info!(records, removed, "full sync committed");
        SyncOutcome::Completed { at, records }
    }

    /// Fetch every collection concurrently into a fresh snapshot.
    ///
    /// A rejected fetch leaves its collection empty. A fetch task that dies
    /// fails the whole sync.
    async fn fetch_all(&self) -> Result<Snapshot> {
        let fetches = Collection::ALL.into_iter().map(|collection| {
            let remote = Arc::clone(&self.inner.remote);
            let task = tokio::spawn(async move { remote.fetch(collection).await });
            async move { (collection, task.await) }
        });

        let mut collections = Vec::with_capacity(Collection::ALL.len());
        for (collection, joined) in join_all(fetches).await {
            let fetched = joined.map_err(|e| Error::Task(format!("fetch of {collection}: {e}")))?;
            let records = fetched.unwrap_or_else(|e| {
                tracing::warn!(%collection, error = %e, "fetch failed, using empty collection");
                Vec::new()
            });
            collections.push((collection, records));
        }
        Ok(Snapshot::from_collections(collections))
    }

    // ------------------------------------------------------------------
    // Commits
    // ------------------------------------------------------------------

    /// Replace the whole snapshot, persist it and stamp the sync time.
    fn commit_snapshot(&self, snapshot: Snapshot) -> DateTime<Utc> {
        let (at, status) = {
            let mut state = self.inner.state.lock();
            // Millisecond precision, matching what the cache store keeps.
            let now = Utc::now().trunc_subsecs(3);
            let at = match state.status.last_synced {
                Some(previous) if previous > now => previous,
                _ => now,
            };
            state.data = snapshot;
            state.status.last_synced = Some(at);
            self.inner.cache.save_snapshot(&state.data);
            self.inner.cache.save_last_synced(at);
            (at, state.status)
        };
        self.inner.events.emit(&EngineEvent::Snapshot);
        self.inner.events.emit(&EngineEvent::Status(status));
        at
    }

    /// Run `f` on one collection under the state lock, then persist.
    ///
    /// `f` sees the current records and edits them in place; its return value
    /// is handed back once the change is committed.
    pub(crate) fn mutate_collection<R>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut Vec<Record>) -> R,
    ) -> R {
        let result = {
            let mut state = self.inner.state.lock();
            let result = f(state.data.records_mut(collection));
            self.inner.cache.save_snapshot(&state.data);
            result
        };
        self.inner.events.emit(&EngineEvent::Collection(collection));
        result
    }

    pub(crate) fn update_status(&self, f: impl FnOnce(&mut SyncState)) {
        let changed = {
            let mut state = self.inner.state.lock();
            let before = state.status;
            f(&mut state.status);
            (state.status != before).then_some(state.status)
        };
        if let Some(status) = changed {
            self.inner.events.emit(&EngineEvent::Status(status));
        }
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.inner.notifier.notify(&notice);
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("state", &self.state())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Holds `is_syncing` up for as long as it lives.
struct SyncingFlag<'a> {
    engine: &'a SyncEngine,
}

impl<'a> SyncingFlag<'a> {
    fn raise(engine: &'a SyncEngine) -> Self {
        engine.update_status(|status| status.is_syncing = true);
        Self { engine }
    }
}

impl Drop for SyncingFlag<'_> {
    fn drop(&mut self) {
        self.engine
            .update_status(|status| status.is_syncing = false);
    }
}
