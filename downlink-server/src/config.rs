//! Process configuration: flags with environment fallbacks.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use downlink_core::SyncConfig;

/// CLI entry point
#[derive(Parser, Debug, Clone)]
#[command(name = "downlink-server")]
#[command(about = "Redirects CLI download requests to verified release artifacts")]
pub struct ServerArgs {
    /// JSON array of hex-encoded Ed25519 root public keys
    #[arg(long, env = "ROOT_KEYS", hide_env_values = true)]
    pub root_keys: String,

    /// Signatures required on each manifest (defaults to every root key)
    #[arg(long, env = "KEY_THRESHOLD")]
    pub key_threshold: Option<usize>,

    /// Base URL of the artifact repository
    #[arg(long, env = "SOURCE_URL")]
    pub source_url: String,

    /// Redis URL for cross-replica invalidation; runs on an in-process bus
    /// when absent
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Pub/sub channel carrying refresh signals
    #[arg(long, env = "SYNC_CHANNEL", default_value = "downlink:refresh")]
    pub channel: String,

    /// Artifact naming stem: artifacts are `{prefix}-{os}-{arch}.gz`
    #[arg(long, env = "ARTIFACT_PREFIX", default_value = "downlink")]
    pub artifact_prefix: String,

    /// Bind address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Cadence of the unconditional convergence re-poll
    #[arg(long, env = "PERIODIC_INTERVAL", value_parser = humantime::parse_duration, default_value = "15m")]
    pub periodic_interval: Duration,

    /// Minimum spacing between fetches against the trusted source
    #[arg(long, env = "MIN_FETCH_INTERVAL", value_parser = humantime::parse_duration, default_value = "1m")]
    pub min_fetch_interval: Duration,

    /// Minimum spacing between outbound peer notifications
    #[arg(long, env = "MIN_NOTIFY_INTERVAL", value_parser = humantime::parse_duration, default_value = "1m")]
    pub min_notify_interval: Duration,

    /// Bounded wait for a single bus poll
    #[arg(long, env = "LISTENER_POLL_TIMEOUT", value_parser = humantime::parse_duration, default_value = "1s")]
    pub listener_poll_timeout: Duration,

    /// Delay before reacquiring the bus after a failure
    #[arg(long, env = "RECONNECT_DELAY", value_parser = humantime::parse_duration, default_value = "1s")]
    pub reconnect_delay: Duration,

    /// Delay before the single retry that follows a failed refresh
    #[arg(long, env = "RETRY_DELAY", value_parser = humantime::parse_duration, default_value = "1m")]
    pub retry_after_failure: Duration,
}

impl ServerArgs {
    /// Timing knobs for the core loops.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            periodic_interval: self.periodic_interval,
            min_fetch_interval: self.min_fetch_interval,
            min_notify_interval: self.min_notify_interval,
            listener_poll_timeout: self.listener_poll_timeout,
            reconnect_delay: self.reconnect_delay,
            retry_after_failure: self.retry_after_failure,
            channel: self.channel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_invocation() {
        let args = ServerArgs::try_parse_from([
            "downlink-server",
            "--root-keys",
            "[]",
            "--source-url",
            "https://releases.example.com",
        ])
        .expect("minimal flags parse");
        assert_eq!(args.periodic_interval, Duration::from_secs(15 * 60));
        assert_eq!(args.min_fetch_interval, Duration::from_secs(60));
        assert_eq!(args.channel, "downlink:refresh");
        assert!(args.redis_url.is_none());
    }

    #[test]
    fn parses_humantime_intervals() {
        let args = ServerArgs::try_parse_from([
            "downlink-server",
            "--root-keys",
            "[]",
            "--source-url",
            "https://releases.example.com",
            "--periodic-interval",
            "90s",
            "--listener-poll-timeout",
            "250ms",
        ])
        .expect("interval flags parse");
        assert_eq!(args.periodic_interval, Duration::from_secs(90));
        assert_eq!(args.listener_poll_timeout, Duration::from_millis(250));
    }
}
