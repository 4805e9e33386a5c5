//! Capacity-one coalescing trigger channels.
//!
//! The loops in this crate never share mutable state; they nudge each other
//! with unit signals where duplicate raises collapse into one. The contract
//! is exactly "best-effort non-blocking enqueue that is a no-op if one is
//! already queued", built on a bounded tokio channel of capacity 1.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Creates a linked raise/consume pair with at most one outstanding signal.
pub fn trigger() -> (Trigger, TriggerQueue) {
    let (tx, rx) = mpsc::channel(1);
    (Trigger { tx }, TriggerQueue { rx })
}

/// Raising side of a coalescing signal. Cheap to clone; any clone may raise.
#[derive(Clone, Debug)]
pub struct Trigger {
    tx: mpsc::Sender<()>,
}

impl Trigger {
    /// Requests one unit of work, without blocking. Raising while a signal
    /// is already pending is a no-op; raising after the consumer is gone is
    /// silently dropped.
    pub fn raise(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => {}
        }
    }
}

/// Consuming side of a coalescing signal. Owned by exactly one loop.
#[derive(Debug)]
pub struct TriggerQueue {
    rx: mpsc::Receiver<()>,
}

impl TriggerQueue {
    /// Waits until a signal is pending and consumes it. Returns `false`
    /// once every [`Trigger`] clone has been dropped, letting the consuming
    /// loop wind down.
    pub async fn acquire(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn burst_of_raises_collapses_to_one() {
        let (trigger, mut queue) = trigger();
        for _ in 0..100 {
            trigger.raise();
        }
        assert!(queue.acquire().await);
        // Nothing else is pending.
        let extra = tokio::time::timeout(Duration::from_millis(20), queue.acquire()).await;
        assert!(extra.is_err(), "coalesced burst left more than one signal");
    }

    #[tokio::test]
    async fn raise_after_consume_is_delivered() {
        let (trigger, mut queue) = trigger();
        trigger.raise();
        assert!(queue.acquire().await);
        trigger.raise();
        assert!(queue.acquire().await);
    }

    #[tokio::test]
    async fn acquire_ends_when_all_triggers_drop() {
        let (trigger, mut queue) = trigger();
        let clone = trigger.clone();
        drop(trigger);
        drop(clone);
        assert!(!queue.acquire().await);
    }

    #[tokio::test]
    async fn raise_after_consumer_drop_is_harmless() {
        let (trigger, queue) = trigger();
        drop(queue);
        trigger.raise();
    }
}
