//! Shared pub/sub boundary used to propagate "something changed" between
//! replicas.
//!
//! The bus is best-effort: it may drop messages or disconnect at any time,
//! and the core tolerates that — the periodic ticker guarantees convergence
//! regardless. [`RedisBus`] is the production implementation; [`MemoryBus`]
//! serves tests and single-replica deployments.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BusError;

pub mod memory;
pub mod redis;

pub use memory::MemoryBus;
pub use redis::RedisBus;

/// Outcome of one bounded poll against a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusPoll {
    /// A peer signalled a change.
    Signal,
    /// Nothing arrived within the bounded wait. Not an error.
    Timeout,
}

/// A live subscription to one channel.
///
/// Owned by exactly one listener for its lifetime and released by dropping
/// it; the connection is never shared or reused.
#[async_trait]
pub trait BusSubscription: Send {
    /// Waits up to `wait` for an inbound signal.
    async fn poll(&mut self, wait: Duration) -> Result<BusPoll, BusError>;
}

/// The external pub/sub channel itself.
#[async_trait]
pub trait ReplicationBus: Send + Sync {
    /// Opens a dedicated subscription to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn BusSubscription>, BusError>;

    /// Emits one change signal on `channel`. Failures are non-fatal.
    async fn publish(&self, channel: &str) -> Result<(), BusError>;
}
