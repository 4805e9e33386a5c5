//! Error taxonomy for the refresh and replication boundaries.

use thiserror::Error;

/// Errors surfaced by the trusted metadata source.
#[derive(Error, Debug)]
pub enum TrustError {
    /// Trust material is missing or invalid, or the mandatory first fetch
    /// failed. The process must not start serving.
    #[error("trust initialization failed: {0}")]
    Initialization(String),

    /// A refresh attempt failed. The cache keeps its last-known-good
    /// snapshot; the scheduler retries once and then waits for the next
    /// trigger.
    #[error("metadata refresh failed: {0}")]
    Transient(String),
}

/// Errors surfaced by the replication bus boundary.
#[derive(Error, Debug)]
pub enum BusError {
    /// Subscribing to the shared channel failed.
    #[error("bus subscribe failed: {0}")]
    Connect(String),

    /// An established subscription broke mid-poll.
    #[error("bus connection lost: {0}")]
    ConnectionLost(String),

    /// An outbound notification did not reach the bus. Never retried.
    #[error("bus publish failed: {0}")]
    Publish(String),
}
