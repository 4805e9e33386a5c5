//! Deterministic collaborators for driving the sync loops without a network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use downlink_core::bus::{BusPoll, BusSubscription, MemoryBus, ReplicationBus};
use downlink_core::error::{BusError, TrustError};
use downlink_core::snapshot::{FileMeta, TargetSnapshot};
use downlink_core::trust::{FetchOutcome, TrustedSource};
use tokio::time::{Instant, sleep};

/// Builds a snapshot whose single artifact `a` has a digest filled with
/// `fill`.
pub fn remote_snapshot(version: u64, fill: u8) -> TargetSnapshot {
    let mut targets = HashMap::new();
    targets.insert(
        "a".to_owned(),
        FileMeta {
            sha512: vec![fill; 64],
            length: 1024,
        },
    );
    TargetSnapshot::new(version, targets)
}

/// Scripted upstream: a mutable "remote" targets document, a fetch log, and
/// an optional per-update latency and failure switch.
pub struct FakeSource {
    remote: Mutex<TargetSnapshot>,
    held: Mutex<Option<TargetSnapshot>>,
    update_times: Mutex<Vec<Instant>>,
    update_delay: Duration,
    failing: AtomicBool,
}

impl FakeSource {
    pub fn new(remote: TargetSnapshot) -> Self {
        Self::with_delay(remote, Duration::ZERO)
    }

    pub fn with_delay(remote: TargetSnapshot, update_delay: Duration) -> Self {
        Self {
            remote: Mutex::new(remote),
            held: Mutex::new(None),
            update_times: Mutex::new(Vec::new()),
            update_delay,
            failing: AtomicBool::new(false),
        }
    }

    /// Replaces the remote document, as an upstream release would.
    pub fn set_remote(&self, snapshot: TargetSnapshot) {
        *self.remote.lock().unwrap() = snapshot;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn update_count(&self) -> usize {
        self.update_times.lock().unwrap().len()
    }

    pub fn update_times(&self) -> Vec<Instant> {
        self.update_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrustedSource for FakeSource {
    async fn update(&self) -> Result<FetchOutcome, TrustError> {
        self.update_times.lock().unwrap().push(Instant::now());
        if !self.update_delay.is_zero() {
            sleep(self.update_delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TrustError::Transient("scripted failure".into()));
        }

        let remote = self.remote.lock().unwrap().clone();
        let mut held = self.held.lock().unwrap();
        match held.as_ref() {
            Some(current) if current.version() == remote.version() => Ok(FetchOutcome::Unchanged),
            _ => {
                *held = Some(remote.clone());
                Ok(FetchOutcome::Updated(remote))
            }
        }
    }

    async fn current_targets(&self) -> Result<TargetSnapshot, TrustError> {
        self.held
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TrustError::Transient("no verified snapshot loaded yet".into()))
    }
}

/// Memory bus wrapper that counts subscriptions and publishes, and can be
/// scripted to fail outright or to break the first subscription.
pub struct TestBus {
    inner: MemoryBus,
    unreachable: AtomicBool,
    break_next_poll: Arc<AtomicBool>,
    subscribes: AtomicUsize,
    publishes: AtomicUsize,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            inner: MemoryBus::new(),
            unreachable: AtomicBool::new(false),
            break_next_poll: Arc::new(AtomicBool::new(false)),
            subscribes: AtomicUsize::new(0),
            publishes: AtomicUsize::new(0),
        }
    }

    /// All subscribe and publish calls fail until further notice.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// The next poll on the most recent subscription reports a lost
    /// connection.
    pub fn break_next_poll(&self) {
        self.break_next_poll.store(true, Ordering::SeqCst);
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplicationBus for TestBus {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BusError::Connect("scripted outage".into()));
        }
        let inner = self.inner.subscribe(channel).await?;
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TestSubscription {
            inner,
            break_next_poll: Arc::clone(&self.break_next_poll),
        }))
    }

    async fn publish(&self, channel: &str) -> Result<(), BusError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(BusError::Publish("scripted outage".into()));
        }
        self.publishes.fetch_add(1, Ordering::SeqCst);
        self.inner.publish(channel).await
    }
}

struct TestSubscription {
    inner: Box<dyn BusSubscription>,
    break_next_poll: Arc<AtomicBool>,
}

#[async_trait]
impl BusSubscription for TestSubscription {
    async fn poll(&mut self, wait: Duration) -> Result<BusPoll, BusError> {
        if self.break_next_poll.swap(false, Ordering::SeqCst) {
            return Err(BusError::ConnectionLost("scripted drop".into()));
        }
        self.inner.poll(wait).await
    }
}
