//! Boundary to the collaborator that fetches and cryptographically verifies
//! release metadata.
//!
//! The core never parses or caches metadata that did not pass through
//! [`TrustedSource::update`]; verification is entirely the source's concern.
//! [`ManifestSource`] is the production implementation; tests inject
//! deterministic fakes.

use async_trait::async_trait;

use crate::error::TrustError;
use crate::snapshot::TargetSnapshot;

pub mod manifest;
pub use manifest::ManifestSource;

/// Result of one update attempt against the trusted source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The source is already at the version we hold. Benign; no side
    /// effects follow.
    Unchanged,
    /// A newer verified snapshot was fetched and is carried here in full.
    Updated(TargetSnapshot),
}

/// A verified upstream source of release metadata.
///
/// Construction validates the trust material and fails fatally when it is
/// missing or invalid; by the time a value of this type exists, `update`
/// may be called freely. Callers serialize updates themselves — the refresh
/// worker never overlaps two fetches.
#[async_trait]
pub trait TrustedSource: Send + Sync {
    /// Fetches the latest metadata and verifies it, distinguishing
    /// "already at latest" from a genuine failure.
    async fn update(&self) -> Result<FetchOutcome, TrustError>;

    /// Returns the full verified target map from the most recent successful
    /// update.
    async fn current_targets(&self) -> Result<TargetSnapshot, TrustError>;
}
