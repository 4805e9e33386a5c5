//! # Downlink Server
//!
//! HTTP frontend for the downlink release redirector.
//!
//! Every request is answered from the replica's current verified snapshot:
//! `/cli` and `/cli/{platform}` 302-redirect to the content-addressed
//! artifact for the requested (or User-Agent-guessed) platform, `/cli.ps1`
//! renders a PowerShell installer pinned to the current Windows build, and
//! `/refresh` raises a fire-and-forget refresh request. The refresh and
//! invalidation machinery itself lives in `downlink-core`.

pub mod config;
pub mod errors;
pub mod installer;
pub mod platform;
pub mod routes;
