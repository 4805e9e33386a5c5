//! The refresh worker: consumes coalesced refresh requests and drives the
//! trusted source, one fetch at a time.

use std::sync::Arc;

use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::signal::{Trigger, TriggerQueue};
use crate::snapshot::SnapshotCache;
use crate::trust::{FetchOutcome, TrustedSource};

/// Sequential consumer of the refresh trigger queue.
///
/// Fetches never overlap and start at least `min_fetch_interval` apart even
/// under a trigger storm. A failed refresh schedules exactly one delayed
/// re-raise; convergence beyond that single retry rests on the next bus or
/// periodic trigger.
pub(crate) struct RefreshWorker {
    source: Arc<dyn TrustedSource>,
    cache: Arc<SnapshotCache>,
    queue: TriggerQueue,
    retry: Trigger,
    notify: Trigger,
    config: SyncConfig,
}

impl RefreshWorker {
    pub(crate) fn new(
        source: Arc<dyn TrustedSource>,
        cache: Arc<SnapshotCache>,
        queue: TriggerQueue,
        retry: Trigger,
        notify: Trigger,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            cache,
            queue,
            retry,
            notify,
            config,
        }
    }

    pub(crate) async fn run(mut self) {
        while self.queue.acquire().await {
            let started = Instant::now();
            self.refresh_once().await;
            // Rate limit: hold off the next fetch until the minimum interval
            // since this one started has passed.
            sleep_until(started + self.config.min_fetch_interval).await;
        }
        debug!("refresh worker stopped");
    }

    async fn refresh_once(&self) {
        match self.source.update().await {
            Ok(FetchOutcome::Unchanged) => {
                debug!("metadata already at latest version");
            }
            Ok(FetchOutcome::Updated(snapshot)) => {
                info!(
                    version = snapshot.version(),
                    targets = snapshot.len(),
                    "publishing refreshed snapshot"
                );
                self.cache.publish(snapshot);
                self.notify.raise();
            }
            Err(err) => {
                warn!(error = %err, "metadata refresh failed");
                self.schedule_retry();
            }
        }
    }

    fn schedule_retry(&self) {
        let retry = self.retry.clone();
        let delay = self.config.retry_after_failure;
        tokio::spawn(async move {
            sleep(delay).await;
            retry.raise();
        });
    }
}
