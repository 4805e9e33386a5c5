//! # Downlink Core
//!
//! Refresh and invalidation machinery for the downlink release redirector.
//!
//! Every replica holds a single immutable, cryptographically verified
//! snapshot of release metadata (artifact name to content digest and size)
//! and answers "where is the current binary for platform X" from that
//! snapshot alone. This crate keeps the snapshot converged with the upstream
//! repository:
//!
//! - [`snapshot::SnapshotCache`] publishes each new snapshot with a single
//!   atomic reference swap, so readers never block and never observe a
//!   partially updated view.
//! - The refresh worker consumes coalesced refresh requests, drives the
//!   [`trust::TrustedSource`] collaborator sequentially, and enforces a
//!   minimum interval between fetches.
//! - The bus listener subscribes to a shared [`bus::ReplicationBus`] channel
//!   and turns inbound change signals into refresh requests, reconnecting
//!   forever on any failure.
//! - The peer notifier fans local changes out to other replicas,
//!   best-effort and rate-limited.
//! - A periodic ticker re-polls the source on a fixed cadence, so replicas
//!   converge even when the bus drops every message.
//!
//! [`service::SyncService::start`] wires the loops together; request
//! handlers only ever touch the cheap-to-clone [`service::SyncHandle`].

pub mod bus;
pub mod config;
pub mod error;
mod refresh;
mod replication;
pub mod service;
pub mod signal;
pub mod snapshot;
pub mod trust;

pub use config::SyncConfig;
pub use error::{BusError, TrustError};
pub use service::{SyncHandle, SyncService};
pub use snapshot::{FileMeta, SnapshotCache, TargetSnapshot};
pub use trust::{FetchOutcome, ManifestSource, TrustedSource};
