//! Timing and channel configuration for the sync loops.

use std::time::Duration;

const DEFAULT_PERIODIC_INTERVAL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_MIN_FETCH_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_MIN_NOTIFY_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_LISTENER_POLL_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_RETRY_AFTER_FAILURE: Duration = Duration::from_secs(60);
const DEFAULT_CHANNEL: &str = "downlink:refresh";

/// Knobs for the refresh worker, replication loops, and periodic ticker.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Cadence of the unconditional re-poll. The convergence backstop: even
    /// with the bus fully unreachable, every replica re-polls the source on
    /// this interval.
    pub periodic_interval: Duration,
    /// Floor between the starts of successive fetches against the trusted
    /// source, regardless of how fast triggers arrive.
    pub min_fetch_interval: Duration,
    /// Floor between successive outbound peer notifications.
    pub min_notify_interval: Duration,
    /// Bounded wait for a single bus poll. Liveness only; a timeout simply
    /// re-polls.
    pub listener_poll_timeout: Duration,
    /// Delay before reacquiring the bus after a subscribe or poll failure.
    pub reconnect_delay: Duration,
    /// Delay before the single re-raise that follows a failed refresh.
    pub retry_after_failure: Duration,
    /// Name of the shared pub/sub channel carrying change signals.
    pub channel: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            periodic_interval: DEFAULT_PERIODIC_INTERVAL,
            min_fetch_interval: DEFAULT_MIN_FETCH_INTERVAL,
            min_notify_interval: DEFAULT_MIN_NOTIFY_INTERVAL,
            listener_poll_timeout: DEFAULT_LISTENER_POLL_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            retry_after_failure: DEFAULT_RETRY_AFTER_FAILURE,
            channel: DEFAULT_CHANNEL.to_owned(),
        }
    }
}
