//! Vector-clock algebra: thread clocks, sync clocks, and transfer operations.
//!
//! A `ThreadClock` is the dense per-thread vector of logical counters; a
//! `SyncClock` is the sparse chunked vector living in a synchronization
//! object. Clock transfer (`acquire`, `release`, `acq_rel`) is a set of free
//! functions taking both clocks as parameters; neither type reaches into
//! the other's representation.
//!
//! ## Invariants
//!
//! - Every slot of every clock is monotone non-decreasing.
//! - A thread's own slot strictly increases via [`ThreadClock::tick`],
//!   invoked immediately before any release so downstream acquirers observe
//!   a fresh epoch.
//! - Logical lengths only grow.

use crate::defs::{Epoch, Tid, CHUNK_SLOTS, MAX_TID};
use crate::slab::{ChunkPool, ClockChunk};

// ---------------------------------------------------------------------------
// ThreadClock
// ---------------------------------------------------------------------------

/// The clock owned by one analyzed thread.
///
/// Dense storage indexed by tid; slots past the logical length are zero.
pub struct ThreadClock {
    nclk: usize,
    clk: Box<[u64]>,
}

impl ThreadClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nclk: 0,
            clk: vec![0u64; MAX_TID].into_boxed_slice(),
        }
    }

    /// Counter for `tid`. Zero for any slot never written.
    #[must_use]
    pub fn get(&self, tid: Tid) -> Epoch {
        debug_assert!((tid as usize) < MAX_TID);
        self.clk[tid as usize]
    }

    /// Sets `tid`'s counter to `v`. `v` must not move the slot backwards.
    pub fn set(&mut self, tid: Tid, v: Epoch) {
        let idx = tid as usize;
        debug_assert!(idx < MAX_TID);
        debug_assert!(v >= self.clk[idx], "clock slot moved backwards");
        self.clk[idx] = v;
        if self.nclk <= idx {
            self.nclk = idx + 1;
        }
    }

    /// Pre-increments the owning thread's own slot and returns the new
    /// epoch. Invoked immediately before every release operation.
    pub fn tick(&mut self, tid: Tid) -> Epoch {
        let idx = tid as usize;
        debug_assert!(idx < MAX_TID);
        self.clk[idx] += 1;
        if self.nclk <= idx {
            self.nclk = idx + 1;
        }
        self.clk[idx]
    }

    /// One past the highest index ever written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nclk
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nclk == 0
    }

    /// Happens-before test against a recorded access `(tid, epoch)`: true
    /// iff this clock has synchronized with that access.
    #[must_use]
    pub fn covers(&self, tid: Tid, epoch: Epoch) -> bool {
        self.get(tid) >= epoch
    }
}

impl Default for ThreadClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreadClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadClock")
            .field("nclk", &self.nclk)
            .field("clk", &&self.clk[..self.nclk])
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SyncClock
// ---------------------------------------------------------------------------

/// The clock living in a synchronization object.
///
/// A growable container of fixed-size chunks obtained from the pool.
/// Absent slots read as zero. Created empty; the first release allocates.
#[derive(Default)]
pub struct SyncClock {
    nclk: usize,
    chunks: Vec<ClockChunk>,
}

impl SyncClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nclk: 0,
            chunks: Vec::new(),
        }
    }

    /// Counter for slot `i`. Absent slots read as zero.
    #[must_use]
    pub fn get(&self, i: usize) -> Epoch {
        match self.chunks.get(i / CHUNK_SLOTS) {
            Some(chunk) => chunk[i % CHUNK_SLOTS],
            None => 0,
        }
    }

    /// Logical length (one past the highest slot a release has covered).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nclk
    }

    /// True before the first release into the object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns every chunk to the pool. Called when the owning sync object
    /// is destroyed.
    pub fn free_into(&mut self, pool: &ChunkPool) {
        for chunk in self.chunks.drain(..) {
            pool.free(chunk);
        }
        self.nclk = 0;
    }

    /// Grows chunk storage to cover at least `n` slots. Release paths call
    /// this with `n >= 1` so the clock always materializes.
    fn ensure_slots(&mut self, n: usize, pool: &ChunkPool) {
        let needed = n.max(1).div_ceil(CHUNK_SLOTS);
        while self.chunks.len() < needed {
            self.chunks.push(pool.alloc());
        }
    }
}

impl std::fmt::Debug for SyncClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClock")
            .field("nclk", &self.nclk)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Transfer operations
// ---------------------------------------------------------------------------

/// The acquiring thread inherits the knowledge accumulated at the sync
/// object: pointwise `tc[i] = max(tc[i], sc[i])`.
///
/// No-op when the sync clock has never been released into.
pub fn acquire(tc: &mut ThreadClock, sc: &SyncClock) {
    if sc.is_empty() {
        return;
    }
    let n = sc.nclk;
    let mut base = 0;
    for chunk in &sc.chunks {
        if base >= n {
            break;
        }
        let cnt = CHUNK_SLOTS.min(n - base);
        // All-zero chunks contribute nothing.
        if chunk[..cnt].iter().any(|&v| v != 0) {
            for (off, &v) in chunk[..cnt].iter().enumerate() {
                let slot = &mut tc.clk[base + off];
                if *slot < v {
                    *slot = v;
                }
            }
        }
        base += cnt;
    }
    if tc.nclk < n {
        tc.nclk = n;
    }
}

/// Publishes the thread's knowledge into the sync object: pointwise
/// `sc[i] = max(sc[i], tc[i])`, growing chunk storage as needed.
pub fn release(tc: &ThreadClock, sc: &mut SyncClock, pool: &ChunkPool) {
    sc.ensure_slots(tc.nclk, pool);
    let mut base = 0;
    for chunk in &mut sc.chunks {
        if base >= tc.nclk {
            break;
        }
        let cnt = CHUNK_SLOTS.min(tc.nclk - base);
        for (slot, &v) in chunk[..cnt].iter_mut().zip(&tc.clk[base..base + cnt]) {
            if *slot < v {
                *slot = v;
            }
        }
        base += cnt;
    }
    if sc.nclk < tc.nclk {
        sc.nclk = tc.nclk;
    }
}

/// Release followed by acquire against a single snapshot of the sync
/// clock: both sides end at the pointwise max. Used for read-modify-write
/// atomics.
pub fn acq_rel(tc: &mut ThreadClock, sc: &mut SyncClock, pool: &ChunkPool) {
    let n = tc.nclk.max(sc.nclk);
    sc.ensure_slots(n, pool);
    let mut base = 0;
    for chunk in &mut sc.chunks {
        if base >= n {
            break;
        }
        let cnt = CHUNK_SLOTS.min(n - base);
        for (off, slot) in chunk[..cnt].iter_mut().enumerate() {
            let t = &mut tc.clk[base + off];
            let m = (*slot).max(*t);
            *slot = m;
            *t = m;
        }
        base += cnt;
    }
    if sc.nclk < n {
        sc.nclk = n;
    }
    if tc.nclk < n {
        tc.nclk = n;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
