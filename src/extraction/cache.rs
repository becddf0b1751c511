use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::types::{Freshness, Tag};

/// Per-process tag cache keyed by path, validated by freshness token.
///
/// Lives for the process and is shared across map builds. Safe for
/// concurrent readers and writers; extraction workers hit it from a
/// rayon pool. Nothing here touches disk.
pub struct TagCache {
    entries: DashMap<Arc<str>, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CacheEntry {
    freshness: Freshness,
    tags: Vec<Tag>,
}

/// Snapshot of cache effectiveness counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
}

impl TagCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up the cached tags for `path`, valid only when the stored
    /// freshness token matches. A token mismatch counts as a miss; the
    /// stale entry stays until the next insert overwrites it.
    pub fn get(&self, path: &Arc<str>, freshness: Freshness) -> Option<Vec<Tag>> {
        match self.entries.get(path) {
            Some(entry) if entry.freshness == freshness => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.tags.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, path: Arc<str>, freshness: Freshness, tags: Vec<Tag>) {
        self.entries.insert(path, CacheEntry { freshness, tags });
    }

    /// Drop the entry for `path`. Collaborators that rewrite files call
    /// this when they cannot rely on the freshness token changing, e.g.
    /// an editor that preserves mtimes.
    pub fn invalidate(&self, path: &str) {
        self.entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn counters(&self) -> CacheCounters {
        CacheCounters {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for TagCache {
    fn default() -> Self {
        Self::new()
    }
}
