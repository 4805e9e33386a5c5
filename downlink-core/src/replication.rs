//! The two replication loops: the bus listener that turns inbound signals
//! into refresh requests, and the peer notifier that fans local changes out.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::bus::{BusPoll, ReplicationBus};
use crate::config::SyncConfig;
use crate::signal::{Trigger, TriggerQueue};

/// Keeps one subscription to the shared channel alive and raises a refresh
/// for every inbound signal.
///
/// Any failure releases the connection, waits the reconnect delay, and
/// subscribes again. This loop never terminates the process; it may raise
/// refreshes as fast as signals arrive, since coalescing inside the refresh
/// worker absorbs bursts.
pub(crate) struct BusListener {
    bus: Arc<dyn ReplicationBus>,
    refresh: Trigger,
    config: SyncConfig,
}

impl BusListener {
    pub(crate) fn new(
        bus: Arc<dyn ReplicationBus>,
        refresh: Trigger,
        config: SyncConfig,
    ) -> Self {
        Self {
            bus,
            refresh,
            config,
        }
    }

    pub(crate) async fn run(self) {
        loop {
            let mut subscription = match self.bus.subscribe(&self.config.channel).await {
                Ok(subscription) => subscription,
                Err(err) => {
                    warn!(error = %err, channel = %self.config.channel, "bus subscribe failed");
                    sleep(self.config.reconnect_delay).await;
                    continue;
                }
            };
            debug!(channel = %self.config.channel, "listening for change signals");

            loop {
                match subscription.poll(self.config.listener_poll_timeout).await {
                    Ok(BusPoll::Signal) => self.refresh.raise(),
                    Ok(BusPoll::Timeout) => {}
                    Err(err) => {
                        warn!(error = %err, "bus poll failed");
                        break;
                    }
                }
            }

            // Release the broken connection before backing off.
            drop(subscription);
            sleep(self.config.reconnect_delay).await;
        }
    }
}

/// Best-effort fan-out of "something changed locally" to peers.
///
/// One notification per consumed signal, at most one per
/// `min_notify_interval`. A failed publish is dropped without retry; peers
/// converge on their own periodic tick.
pub(crate) struct PeerNotifier {
    bus: Arc<dyn ReplicationBus>,
    queue: TriggerQueue,
    config: SyncConfig,
}

impl PeerNotifier {
    pub(crate) fn new(
        bus: Arc<dyn ReplicationBus>,
        queue: TriggerQueue,
        config: SyncConfig,
    ) -> Self {
        Self { bus, queue, config }
    }

    pub(crate) async fn run(mut self) {
        while self.queue.acquire().await {
            match self.bus.publish(&self.config.channel).await {
                Ok(()) => {
                    debug!(channel = %self.config.channel, "notified peers of snapshot change");
                }
                Err(err) => {
                    warn!(error = %err, "peer notification dropped");
                }
            }
            sleep(self.config.min_notify_interval).await;
        }
        debug!("peer notifier stopped");
    }
}
