//! Pooled allocation of sync-clock chunks.
//!
//! Sync clocks grow in fixed 128-slot chunks. Chunks churn with sync-object
//! lifetime (every mutex destroy returns them, every first release takes
//! one), so freed chunks are cached on a free list instead of going back to
//! the process allocator. Chunks are individually boxed; freeing one never
//! invalidates another.
//!
//! The free list sits behind a sleepable mutex: chunk traffic is off the
//! memory-access hot path, and the uncontended lock acquisition keeps the
//! cache-hit case effectively wait-free.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::defs::CHUNK_SLOTS;

/// One fixed-size block of sync-clock slots.
pub type ClockChunk = Box<[u64; CHUNK_SLOTS]>;

/// Upper bound on cached free chunks; beyond this they go back to the
/// process allocator.
const FREE_LIST_CAP: usize = 1024;

/// Thread-safe cache of clock chunks.
#[derive(Default)]
pub struct ChunkPool {
    free: Mutex<Vec<ClockChunk>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    outstanding: AtomicU64,
}

impl ChunkPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a zero-initialized chunk, reusing a cached one if available.
    pub fn alloc(&self) -> ClockChunk {
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        if let Some(mut chunk) = self.free.lock().pop() {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            chunk.fill(0);
            return chunk;
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        // The process allocator aborts on exhaustion, which is the required
        // fatal behavior for chunk storage.
        Box::new([0u64; CHUNK_SLOTS])
    }

    /// Returns a chunk to the cache (or the process allocator if full).
    pub fn free(&self, chunk: ClockChunk) {
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        let mut free = self.free.lock();
        if free.len() < FREE_LIST_CAP {
            free.push(chunk);
        }
    }

    /// Chunks handed out and not yet returned.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::Relaxed)
    }

    /// (cache hits, cache misses) since construction.
    #[must_use]
    pub fn cache_counters(&self) -> (u64, u64) {
        (
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
        )
    }
}
