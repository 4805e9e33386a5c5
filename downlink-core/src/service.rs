//! Construction and lifecycle of the sync loops.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::bus::ReplicationBus;
use crate::config::SyncConfig;
use crate::error::TrustError;
use crate::refresh::RefreshWorker;
use crate::replication::{BusListener, PeerNotifier};
use crate::signal::{Trigger, trigger};
use crate::snapshot::{SnapshotCache, TargetSnapshot};
use crate::trust::TrustedSource;

/// Read and trigger surface handed to request handlers. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    cache: Arc<SnapshotCache>,
    refresh: Trigger,
}

impl SyncHandle {
    /// Builds a handle over an existing cache, outside of a running
    /// [`SyncService`]. The refresh side goes nowhere unless the matching
    /// queue is consumed; mainly useful in tests.
    pub fn detached(cache: Arc<SnapshotCache>, refresh: Trigger) -> Self {
        Self { cache, refresh }
    }

    /// Current snapshot, or `None` until the first successful fetch. Never
    /// blocks, never fails.
    pub fn snapshot(&self) -> Option<Arc<TargetSnapshot>> {
        self.cache.read()
    }

    /// Fire-and-forget refresh request, coalesced with any already pending.
    pub fn request_refresh(&self) {
        self.refresh.raise();
    }
}

/// Owns the background loops; dropping the service aborts them.
#[derive(Debug)]
pub struct SyncService {
    handle: SyncHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncService {
    /// Runs the mandatory first fetch and spawns the background loops.
    ///
    /// Startup order is fixed: the source's trust material was validated at
    /// construction, the first update and target read must succeed before
    /// any reader is served, and only then do the loops start. A first-load
    /// failure is an initialization error and aborts startup.
    pub async fn start(
        source: Arc<dyn TrustedSource>,
        bus: Arc<dyn ReplicationBus>,
        config: SyncConfig,
    ) -> Result<Self, TrustError> {
        let cache = Arc::new(SnapshotCache::new());

        source.update().await.map_err(|err| {
            TrustError::Initialization(format!("first metadata update failed: {err}"))
        })?;
        let snapshot = source.current_targets().await.map_err(|err| {
            TrustError::Initialization(format!("first target read failed: {err}"))
        })?;
        info!(
            version = snapshot.version(),
            targets = snapshot.len(),
            "loaded initial snapshot"
        );
        cache.publish(snapshot);

        let (refresh, refresh_queue) = trigger();
        let (notify, notify_queue) = trigger();

        let worker = RefreshWorker::new(
            Arc::clone(&source),
            Arc::clone(&cache),
            refresh_queue,
            refresh.clone(),
            notify.clone(),
            config.clone(),
        );
        let listener = BusListener::new(Arc::clone(&bus), refresh.clone(), config.clone());
        let notifier = PeerNotifier::new(bus, notify_queue, config.clone());

        let tasks = vec![
            tokio::spawn(worker.run()),
            tokio::spawn(listener.run()),
            tokio::spawn(notifier.run()),
            tokio::spawn(periodic_tick(refresh.clone(), config.periodic_interval)),
        ];

        Ok(Self {
            handle: SyncHandle { cache, refresh },
            tasks,
        })
    }

    /// Handle for request handlers and manual triggers.
    pub fn handle(&self) -> SyncHandle {
        self.handle.clone()
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Raises a refresh on a fixed cadence, independent of the bus.
async fn periodic_tick(refresh: Trigger, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // An interval yields immediately; the initial snapshot is already
    // loaded, so skip that first tick.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        refresh.raise();
    }
}
