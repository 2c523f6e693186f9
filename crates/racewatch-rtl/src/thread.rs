//! Per-thread state and the thread lifecycle protocol.
//!
//! Each analyzed thread owns a [`ThreadCtx`]: its vector clock, ignore
//! counters, and nothing else. The registry keeps one slot per possible
//! tid; a slot carries the context cell, a runtime-depth counter, and a
//! handoff sync clock used by the create/start and exit/join edges.
//!
//! ## Delivery discipline
//!
//! The host runs inside the analyzed process and delivers a thread's
//! events on that thread; events for one tid are never concurrent with
//! each other. The context cell is therefore accessed without a lock;
//! cross-thread edges (create, join) go exclusively through the slot's
//! handoff clock, which has its own mutex. Status transitions are atomics
//! so lifecycle races from a misbehaving host degrade into dropped events
//! rather than unsoundness.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};

use racewatch_core::clock::{self, SyncClock, ThreadClock};
use racewatch_core::defs::{Tid, MAX_TID};
use racewatch_core::mutex::RwSpinMutex;
use racewatch_core::slab::ChunkPool;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

const STATUS_INVALID: u32 = 0;
const STATUS_CREATED: u32 = 1;
const STATUS_RUNNING: u32 = 2;
const STATUS_FINISHED: u32 = 3;
const STATUS_JOINED: u32 = 4;

// ---------------------------------------------------------------------------
// Per-thread context
// ---------------------------------------------------------------------------

/// State owned by exactly one analyzed thread.
pub struct ThreadCtx {
    pub tid: Tid,
    pub clock: ThreadClock,
    /// Depth of `IgnoreReadsBegin` nesting; nonzero suppresses shadow
    /// updates for reads (never clock updates).
    pub ignore_reads: u32,
    /// Same for writes.
    pub ignore_writes: u32,
}

impl ThreadCtx {
    fn new(tid: Tid) -> Box<Self> {
        Box::new(Self {
            tid,
            clock: ThreadClock::new(),
            ignore_reads: 0,
            ignore_writes: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

struct ThreadSlot {
    status: AtomicU32,
    /// Runtime re-entrancy depth for this thread.
    in_rtl: AtomicU32,
    /// Clock published by the parent at create and by the thread itself at
    /// exit; consumed by the thread at start and by the joiner.
    handoff: RwSpinMutex<SyncClock>,
    ctx: UnsafeCell<Option<Box<ThreadCtx>>>,
}

// SAFETY: `ctx` is only touched from the thread the slot belongs to (see
// the delivery discipline above); everything else is atomics or mutexed.
unsafe impl Sync for ThreadSlot {}

impl ThreadSlot {
    fn new() -> Self {
        Self {
            status: AtomicU32::new(STATUS_INVALID),
            in_rtl: AtomicU32::new(0),
            handoff: RwSpinMutex::new(SyncClock::new()),
            ctx: UnsafeCell::new(None),
        }
    }
}

/// Drops the runtime-depth count when an entry point returns.
pub struct RtlGuard<'a> {
    slot: &'a ThreadSlot,
}

impl Drop for RtlGuard<'_> {
    fn drop(&mut self) {
        self.slot.in_rtl.fetch_sub(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All thread slots, indexed by tid.
pub struct ThreadRegistry {
    slots: Box<[ThreadSlot]>,
}

impl ThreadRegistry {
    /// Builds the registry and starts the main thread, which exists before
    /// any create event can be observed.
    #[must_use]
    pub fn new(main_tid: Tid) -> Self {
        let registry = Self {
            slots: (0..MAX_TID).map(|_| ThreadSlot::new()).collect(),
        };
        let slot = &registry.slots[main_tid as usize];
        let mut ctx = ThreadCtx::new(main_tid);
        ctx.clock.tick(main_tid);
        // SAFETY: no other thread can reference the registry yet.
        unsafe {
            *slot.ctx.get() = Some(ctx);
        }
        slot.status.store(STATUS_RUNNING, Ordering::Release);
        registry
    }

    /// Marks the runtime entered for `tid`. Returns `None` when the event
    /// is re-entrant (the host called back into instrumented code) or the
    /// tid is out of range; such events are dropped.
    pub fn enter(&self, tid: Tid) -> Option<RtlGuard<'_>> {
        let slot = self.slots.get(tid as usize)?;
        if slot.in_rtl.fetch_add(1, Ordering::Relaxed) > 0 {
            slot.in_rtl.fetch_sub(1, Ordering::Relaxed);
            return None;
        }
        Some(RtlGuard { slot })
    }

    /// Runs `f` against the context of a running thread.
    pub fn with_ctx<R>(&self, tid: Tid, f: impl FnOnce(&mut ThreadCtx) -> R) -> Option<R> {
        let slot = self.slots.get(tid as usize)?;
        if slot.status.load(Ordering::Acquire) != STATUS_RUNNING {
            return None;
        }
        // SAFETY: per the delivery discipline only the owning thread is
        // here, and re-entrant borrows are cut off by `enter`.
        let ctx = unsafe { &mut *slot.ctx.get() };
        ctx.as_mut().map(|c| f(c))
    }

    /// Parent-side half of thread creation: publish the parent's clock
    /// into the child slot's handoff. Returns false on a malformed event
    /// (unknown parent, child slot already in use).
    pub fn create(&self, parent: Tid, child: Tid, pool: &ChunkPool) -> bool {
        assert!(
            (child as usize) < MAX_TID,
            "thread id {child} reaches the MAX_TID limit"
        );
        let slot = &self.slots[child as usize];
        let prev = slot.status.load(Ordering::Acquire);
        if prev != STATUS_INVALID && prev != STATUS_JOINED {
            return false;
        }
        let published = self
            .with_ctx(parent, |ctx| {
                ctx.clock.tick(parent);
                let mut handoff = slot.handoff.lock();
                handoff.free_into(pool);
                clock::release(&ctx.clock, &mut handoff, pool);
            })
            .is_some();
        if !published {
            return false;
        }
        slot.status.store(STATUS_CREATED, Ordering::Release);
        true
    }

    /// Child-side half: materialize the context, inherit the creator's
    /// clock, and tick so the thread's first epoch is nonzero.
    pub fn start(&self, _parent: Tid, child: Tid) -> bool {
        assert!(
            (child as usize) < MAX_TID,
            "thread id {child} reaches the MAX_TID limit"
        );
        let slot = &self.slots[child as usize];
        let prev = slot.status.load(Ordering::Acquire);
        if prev != STATUS_CREATED {
            return false;
        }
        let mut ctx = ThreadCtx::new(child);
        {
            let handoff = slot.handoff.read_lock();
            clock::acquire(&mut ctx.clock, &handoff);
        }
        ctx.clock.tick(child);
        // SAFETY: the starting thread is the slot's owner from here on; no
        // context existed before this point.
        unsafe {
            *slot.ctx.get() = Some(ctx);
        }
        slot.status.store(STATUS_RUNNING, Ordering::Release);
        true
    }

    /// Publish the exiting thread's clock and destroy its context.
    pub fn exit(&self, tid: Tid, pool: &ChunkPool) -> bool {
        let Some(slot) = self.slots.get(tid as usize) else {
            return false;
        };
        let published = self
            .with_ctx(tid, |ctx| {
                ctx.clock.tick(tid);
                let mut handoff = slot.handoff.lock();
                clock::release(&ctx.clock, &mut handoff, pool);
            })
            .is_some();
        if !published {
            return false;
        }
        slot.status.store(STATUS_FINISHED, Ordering::Release);
        // SAFETY: the exiting thread owns the slot and no longer uses the
        // context after this event.
        unsafe {
            *slot.ctx.get() = None;
        }
        true
    }

    /// Joiner-side half: inherit everything the joined thread did.
    pub fn join(&self, parent: Tid, child: Tid, pool: &ChunkPool) -> bool {
        let Some(slot) = self.slots.get(child as usize) else {
            return false;
        };
        if slot.status.load(Ordering::Acquire) != STATUS_FINISHED {
            return false;
        }
        let joined = self
            .with_ctx(parent, |ctx| {
                let handoff = slot.handoff.read_lock();
                clock::acquire(&mut ctx.clock, &handoff);
            })
            .is_some();
        if !joined {
            return false;
        }
        slot.handoff.lock().free_into(pool);
        slot.status.store(STATUS_JOINED, Ordering::Release);
        true
    }

    /// Tids still running. Finalize turns each into a thread-leak report.
    #[must_use]
    pub fn running_threads(&self) -> Vec<Tid> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status.load(Ordering::Acquire) == STATUS_RUNNING)
            .map(|(tid, _)| tid as Tid)
            .collect()
    }

    /// Returns every outstanding handoff clock's chunks to the pool. Keeps
    /// the process from leaking chunk storage when threads were never
    /// joined (or never exited).
    pub fn reclaim_handoffs(&self, pool: &ChunkPool) {
        for slot in self.slots.iter() {
            slot.handoff.lock().free_into(pool);
        }
    }

    /// Highest tid ever brought into existence, plus one.
    #[must_use]
    pub fn high_water(&self) -> u64 {
        self.slots
            .iter()
            .rposition(|s| s.status.load(Ordering::Acquire) != STATUS_INVALID)
            .map_or(0, |i| i as u64 + 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
