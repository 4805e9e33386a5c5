//! Redis pub/sub implementation of the replication bus.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{BusPoll, BusSubscription, ReplicationBus};
use crate::error::BusError;

/// Replication bus over Redis pub/sub.
///
/// Publishes through a shared [`ConnectionManager`]; each subscription opens
/// its own dedicated connection, since a Redis connection in subscriber mode
/// cannot serve regular commands.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisBus {
    /// Connects the publishing side eagerly so that a misconfigured URL
    /// surfaces at startup rather than on the first notify.
    pub async fn connect(redis_url: &str) -> Result<Self, BusError> {
        info!("connecting to replication bus at {redis_url}");

        let client = redis::Client::open(redis_url)
            .map_err(|err| BusError::Connect(format!("invalid redis url: {err}")))?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(|err| BusError::Connect(format!("failed to connect to redis: {err}")))?;

        Ok(Self { client, publisher })
    }
}

impl fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBus")
            .field("publisher", &"ConnectionManager")
            .finish()
    }
}

#[async_trait]
impl ReplicationBus for RedisBus {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(|err| {
            BusError::Connect(format!("failed to open subscriber connection: {err}"))
        })?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|err| BusError::Connect(format!("failed to subscribe to {channel}: {err}")))?;
        debug!(channel, "subscribed to replication channel");
        Ok(Box::new(RedisSubscription { pubsub }))
    }

    async fn publish(&self, channel: &str) -> Result<(), BusError> {
        let mut conn = self.publisher.clone();
        conn.publish::<_, _, ()>(channel, 1)
            .await
            .map_err(|err| BusError::Publish(format!("redis PUBLISH failed: {err}")))
    }
}

struct RedisSubscription {
    pubsub: redis::aio::PubSub,
}

#[async_trait]
impl BusSubscription for RedisSubscription {
    async fn poll(&mut self, wait: Duration) -> Result<BusPoll, BusError> {
        let mut messages = self.pubsub.on_message();
        match timeout(wait, messages.next()).await {
            Err(_) => Ok(BusPoll::Timeout),
            Ok(Some(_)) => Ok(BusPoll::Signal),
            Ok(None) => Err(BusError::ConnectionLost(
                "subscriber stream closed".into(),
            )),
        }
    }
}
