//! In-process replication bus.
//!
//! Backs tests and single-replica deployments that run without Redis. Like
//! its production counterpart it delivers a replica's own notifications
//! back to it; the resulting self-triggered refresh comes back `Unchanged`
//! and is absorbed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tokio::time::timeout;

use super::{BusPoll, BusSubscription, ReplicationBus};
use crate::error::BusError;

const CHANNEL_CAPACITY: usize = 16;

/// Broadcast-channel bus shared by every handle cloned from it.
#[derive(Debug, Default)]
pub struct MemoryBus {
    channels: Mutex<HashMap<String, broadcast::Sender<()>>>,
}

impl MemoryBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    async fn sender(&self, channel: &str) -> broadcast::Sender<()> {
        self.channels
            .lock()
            .await
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl ReplicationBus for MemoryBus {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError> {
        Ok(Box::new(MemorySubscription {
            rx: self.sender(channel).await.subscribe(),
        }))
    }

    async fn publish(&self, channel: &str) -> Result<(), BusError> {
        // Zero subscribers is fine; the channel is best-effort.
        let _ = self.sender(channel).await.send(());
        Ok(())
    }
}

struct MemorySubscription {
    rx: broadcast::Receiver<()>,
}

#[async_trait]
impl BusSubscription for MemorySubscription {
    async fn poll(&mut self, wait: Duration) -> Result<BusPoll, BusError> {
        match timeout(wait, self.rx.recv()).await {
            Err(_) => Ok(BusPoll::Timeout),
            Ok(Ok(())) => Ok(BusPoll::Signal),
            // A lagged receiver still learned that something changed.
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => Ok(BusPoll::Signal),
            Ok(Err(broadcast::error::RecvError::Closed)) => Err(BusError::ConnectionLost(
                "memory bus channel closed".into(),
            )),
        }
    }
}
