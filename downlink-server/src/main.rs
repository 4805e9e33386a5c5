//! downlink-server entry point.
//!
//! Startup order is deliberate: trust material is validated first, the
//! mandatory first metadata fetch runs next (a failure aborts startup), and
//! only once a verified snapshot is published does the HTTP listener bind.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use downlink_core::{
    SyncService,
    bus::{MemoryBus, RedisBus, ReplicationBus},
    trust::ManifestSource,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use downlink_server::{config::ServerArgs, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServerArgs::parse();

    let source = ManifestSource::new(&args.source_url, &args.root_keys, args.key_threshold)
        .context("missing or invalid ROOT_KEYS")?;

    let bus: Arc<dyn ReplicationBus> = match &args.redis_url {
        Some(url) => Arc::new(
            RedisBus::connect(url)
                .await
                .context("error connecting to replication bus")?,
        ),
        None => {
            info!("no redis url configured; running with the in-process bus");
            Arc::new(MemoryBus::new())
        }
    };

    let service = SyncService::start(Arc::new(source), bus, args.sync_config())
        .await
        .context("error running first update")?;

    let state = routes::AppState {
        sync: service.handle(),
        source_url: args.source_url.trim_end_matches('/').to_owned(),
        artifact_prefix: args.artifact_prefix.clone(),
    };
    let app = routes::router(state);

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "serving release redirects");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Stops the sync loops once the listener has drained.
    drop(service);
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
