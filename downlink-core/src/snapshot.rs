//! Immutable release-metadata snapshots and their lock-free publication.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Verified metadata for a single release artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMeta {
    /// SHA-512 digest of the artifact contents.
    pub sha512: Vec<u8>,
    /// Artifact size in bytes.
    pub length: u64,
}

impl FileMeta {
    /// Lowercase hex rendering of the digest, as used in artifact URLs and
    /// installer checksums.
    pub fn sha512_hex(&self) -> String {
        hex::encode(&self.sha512)
    }
}

/// The full verified mapping from artifact name to [`FileMeta`] at one
/// upstream version.
///
/// Snapshots are replaced wholesale and never mutated in place; holding an
/// `Arc<TargetSnapshot>` guarantees a consistent view for as long as the
/// reference lives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetSnapshot {
    version: u64,
    targets: HashMap<String, FileMeta>,
}

impl TargetSnapshot {
    /// Builds a snapshot at the given upstream version.
    pub fn new(version: u64, targets: HashMap<String, FileMeta>) -> Self {
        Self { version, targets }
    }

    /// Upstream version this snapshot was verified at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Looks up one artifact by name.
    pub fn get(&self, name: &str) -> Option<&FileMeta> {
        self.targets.get(name)
    }

    /// Number of artifacts in the snapshot.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the snapshot carries no artifacts at all.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterates over the artifact names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }
}

/// Holds the single current snapshot for a replica.
///
/// `publish` is one atomic pointer swap; `read` is lock-free and never
/// blocks. A reader that loaded the previous snapshot keeps a fully
/// consistent view until it drops its `Arc`, at which point the superseded
/// snapshot is reclaimed.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: ArcSwapOption<TargetSnapshot>,
}

impl SnapshotCache {
    /// Creates an empty cache. Reads return `None` until the first publish.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot. Safe under any number of concurrent
    /// readers.
    pub fn publish(&self, snapshot: TargetSnapshot) {
        self.current.store(Some(Arc::new(snapshot)));
    }

    /// Returns the current snapshot, or `None` if nothing was ever
    /// published.
    pub fn read(&self) -> Option<Arc<TargetSnapshot>> {
        self.current.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_of(version: u64, entries: &[(&str, u8)]) -> TargetSnapshot {
        let targets = entries
            .iter()
            .map(|(name, fill)| {
                (
                    (*name).to_owned(),
                    FileMeta {
                        sha512: vec![*fill; 64],
                        length: u64::from(*fill) * 100,
                    },
                )
            })
            .collect();
        TargetSnapshot::new(version, targets)
    }

    #[test]
    fn empty_cache_reads_none() {
        let cache = SnapshotCache::new();
        assert!(cache.read().is_none());
    }

    #[test]
    fn publish_replaces_wholesale() {
        let cache = SnapshotCache::new();
        cache.publish(snapshot_of(1, &[("a", 1), ("b", 2)]));
        cache.publish(snapshot_of(2, &[("a", 3)]));

        let current = cache.read().expect("published");
        assert_eq!(current.version(), 2);
        assert_eq!(current.len(), 1);
        assert_eq!(current.get("a").expect("a").sha512, vec![3; 64]);
        assert!(current.get("b").is_none());
    }

    #[test]
    fn held_reference_survives_publish_intact() {
        let cache = SnapshotCache::new();
        cache.publish(snapshot_of(1, &[("a", 1), ("b", 1), ("c", 1)]));

        let held = cache.read().expect("published");
        cache.publish(snapshot_of(2, &[("a", 9), ("b", 9), ("c", 9)]));

        // The old reference is still the complete old snapshot.
        assert_eq!(held.version(), 1);
        for name in ["a", "b", "c"] {
            assert_eq!(held.get(name).expect(name).sha512, vec![1; 64]);
        }
        // A fresh read is the complete new snapshot.
        let fresh = cache.read().expect("published");
        for name in ["a", "b", "c"] {
            assert_eq!(fresh.get(name).expect(name).sha512, vec![9; 64]);
        }
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_view() {
        let cache = Arc::new(SnapshotCache::new());
        cache.publish(snapshot_of(1, &[("a", 1), ("b", 1)]));

        let reader = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    let snapshot = cache.read().expect("initialized");
                    let a = &snapshot.get("a").expect("a").sha512;
                    let b = &snapshot.get("b").expect("b").sha512;
                    assert_eq!(a, b, "entries from different snapshots observed");
                }
            })
        };

        for round in 0..100u8 {
            cache.publish(snapshot_of(
                u64::from(round) + 2,
                &[("a", round), ("b", round)],
            ));
        }
        reader.join().expect("reader panicked");
    }
}
