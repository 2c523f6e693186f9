//! The event dispatcher: host events in, clock transfers and race reports
//! out.
//!
//! One `Detector` instance serves the whole analyzed process and is
//! entered concurrently by many threads; there is no event loop. Entry
//! points are best-effort: malformed event sequences are counted, traced
//! at warn level, reported where the anomaly has a report type, and never
//! abort. Only storage exhaustion is fatal.

use std::sync::Arc;

use racewatch_core::clock::{self, SyncClock};
use racewatch_core::defs::{Tid, MAIN_TID};
use racewatch_core::report::{self, PairDedup, ReportDesc, ReportMop, ReportType};
use racewatch_core::shadow::{MemoryAccess, RaceHit, ShadowExhausted, ShadowMap};
use racewatch_core::slab::ChunkPool;
use racewatch_core::stats::{Stats, StatsSnapshot};

use crate::config::{ConfigError, DetectorConfig};
use crate::event::{Annotation, Event};
use crate::host::Host;
use crate::sync::{LockOutcome, ReadUnlockOutcome, SyncKind, SyncRegistry, SyncVar, UnlockOutcome};
use crate::thread::ThreadRegistry;

/// The core's single entry object.
pub struct Detector {
    cfg: DetectorConfig,
    host: Arc<dyn Host>,
    pool: ChunkPool,
    shadow: ShadowMap,
    syncs: SyncRegistry,
    threads: ThreadRegistry,
    stats: Stats,
    dedup: PairDedup,
    benign: parking_lot::Mutex<Vec<(usize, usize)>>,
}

impl Detector {
    /// Validates the configuration and registers the main thread.
    pub fn new(cfg: DetectorConfig, host: Arc<dyn Host>) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let dedup = PairDedup::new(cfg.report_dedup_window);
        Ok(Self {
            cfg,
            host,
            pool: ChunkPool::new(),
            shadow: ShadowMap::new(),
            syncs: SyncRegistry::new(),
            threads: ThreadRegistry::new(MAIN_TID),
            stats: Stats::default(),
            dedup,
            benign: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Routes a recorded event to its entry point.
    pub fn dispatch(&self, ev: Event) {
        match ev {
            Event::ThreadCreate { parent, child } => self.on_thread_create(parent, child),
            Event::ThreadStart { parent, child } => self.on_thread_start(parent, child),
            Event::ThreadJoin { parent, child } => self.on_thread_join(parent, child),
            Event::ThreadExit { tid } => self.on_thread_exit(tid),
            Event::MemoryAccess { tid, pc, addr, size, is_write } => {
                self.on_memory_access(tid, pc, addr, size, is_write);
            }
            Event::RangeInit { tid, pc, addr, size } => {
                self.on_memory_range_init(tid, pc, addr, size);
            }
            Event::RangeFreed { tid, pc, addr, size } => {
                self.on_memory_range_freed(tid, pc, addr, size);
            }
            Event::MutexCreate { tid, pc, addr } => self.on_mutex_create(tid, pc, addr),
            Event::MutexDestroy { tid, pc, addr } => self.on_mutex_destroy(tid, pc, addr),
            Event::MutexLock { tid, pc, addr } => self.on_mutex_lock(tid, pc, addr),
            Event::MutexUnlock { tid, pc, addr } => self.on_mutex_unlock(tid, pc, addr),
            Event::MutexReadLock { tid, pc, addr } => self.on_mutex_read_lock(tid, pc, addr),
            Event::MutexReadUnlock { tid, pc, addr } => self.on_mutex_read_unlock(tid, pc, addr),
            Event::AtomicAcquire { tid, pc, addr } => self.on_atomic_acquire(tid, pc, addr),
            Event::AtomicRelease { tid, pc, addr } => self.on_atomic_release(tid, pc, addr),
            Event::AtomicAcquireRelease { tid, pc, addr } => {
                self.on_atomic_acquire_release(tid, pc, addr);
            }
            Event::Annotation { tid, pc, annotation } => self.on_annotation(tid, pc, annotation),
        }
    }

    // -----------------------------------------------------------------------
    // Memory accesses
    // -----------------------------------------------------------------------

    pub fn on_memory_access(&self, tid: Tid, pc: u64, addr: usize, size: usize, is_write: bool) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        if size == 0 {
            return;
        }
        Stats::bump(&self.stats.mop);
        Stats::bump(if is_write {
            &self.stats.mop_write
        } else {
            &self.stats.mop_read
        });
        if !self.shadow.is_tracked(addr) {
            Stats::bump(&self.stats.mop_untracked);
            // Clock state is unaffected by untracked accesses; nothing to do.
            return;
        }
        if !matches!(size, 1 | 2 | 4 | 8) || addr % size != 0 {
            Stats::bump(&self.stats.mop_range);
        }

        let access = MemoryAccess { tid, pc, addr, size, is_write };
        let outcome = self.threads.with_ctx(tid, |ctx| {
            if (is_write && ctx.ignore_writes > 0) || (!is_write && ctx.ignore_reads > 0) {
                Stats::bump(&self.stats.mop_ignored);
                return (0, Vec::new());
            }
            let mut hits = Vec::new();
            self.shadow
                .record_access(&ctx.clock, &access, &mut |hit| hits.push(hit));
            (ctx.clock.get(tid), hits)
        });
        let Some((epoch, hits)) = outcome else {
            Stats::bump(&self.stats.bad_event);
            return;
        };
        for hit in hits {
            self.report_race(&access, epoch, hit);
        }
    }

    fn report_race(&self, access: &MemoryAccess, epoch: u64, hit: RaceHit) {
        if self.is_benign(hit.byte_addr) {
            Stats::bump(&self.stats.race_benign);
            return;
        }
        if !self.dedup.insert(access.pc, hit.prior_pc) {
            Stats::bump(&self.stats.race_deduped);
            return;
        }
        let desc = ReportDesc {
            typ: ReportType::Race,
            mops: vec![
                ReportMop {
                    tid: access.tid,
                    epoch,
                    addr: access.addr,
                    size: access.size,
                    is_write: access.is_write,
                    pc: Some(access.pc),
                    stack: Some(self.host.current_stack(access.tid)),
                },
                ReportMop {
                    tid: hit.prior.tid,
                    epoch: hit.prior.epoch,
                    addr: hit.byte_addr,
                    size: if hit.prior.is_range { 1 } else { hit.prior.size as usize },
                    is_write: hit.prior.is_write,
                    pc: (hit.prior_pc != 0).then_some(hit.prior_pc),
                    stack: None,
                },
            ],
            addr: Some(hit.byte_addr),
            tid: Some(access.tid),
            stack: None,
            origin_stack: None,
        };
        self.deliver(desc);
    }

    fn is_benign(&self, addr: usize) -> bool {
        self.benign
            .lock()
            .iter()
            .any(|&(base, size)| addr >= base && addr < base.saturating_add(size))
    }

    // -----------------------------------------------------------------------
    // Memory ranges
    // -----------------------------------------------------------------------

    pub fn on_memory_range_init(&self, tid: Tid, _pc: u64, addr: usize, size: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.range_init);
        if let Err(err) = self.shadow.register_range(addr, size) {
            self.fatal(err);
        }
    }

    pub fn on_memory_range_freed(&self, tid: Tid, _pc: u64, addr: usize, size: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.range_free);
        self.shadow.reset_range(addr, size);
    }

    /// Storage exhaustion: flush what we know and abort the process.
    fn fatal(&self, err: ShadowExhausted) -> ! {
        let snapshot = self.stats.snapshot();
        tracing::error!(?snapshot, %err, "fatal resource exhaustion");
        panic!("racewatch: {err}");
    }

    // -----------------------------------------------------------------------
    // Threads
    // -----------------------------------------------------------------------

    pub fn on_thread_create(&self, parent: Tid, child: Tid) {
        let Some(_rtl) = self.threads.enter(parent) else {
            return;
        };
        Stats::bump(&self.stats.thread_create);
        if self.threads.create(parent, child, &self.pool) {
            tracing::debug!(parent, child, "thread created");
        } else {
            Stats::bump(&self.stats.bad_event);
            tracing::warn!(parent, child, "malformed thread-create event");
        }
    }

    pub fn on_thread_start(&self, parent: Tid, child: Tid) {
        let Some(_rtl) = self.threads.enter(child) else {
            return;
        };
        Stats::bump(&self.stats.thread_start);
        if !self.threads.start(parent, child) {
            Stats::bump(&self.stats.bad_event);
            tracing::warn!(parent, child, "thread-start without a create");
        }
    }

    pub fn on_thread_exit(&self, tid: Tid) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.thread_finish);
        if !self.threads.exit(tid, &self.pool) {
            Stats::bump(&self.stats.bad_event);
            tracing::warn!(tid, "thread-exit for a thread that is not running");
        }
    }

    pub fn on_thread_join(&self, parent: Tid, child: Tid) {
        let Some(_rtl) = self.threads.enter(parent) else {
            return;
        };
        Stats::bump(&self.stats.thread_join);
        if !self.threads.join(parent, child, &self.pool) {
            Stats::bump(&self.stats.bad_event);
            tracing::warn!(parent, child, "join of a thread that has not exited");
        }
    }

    // -----------------------------------------------------------------------
    // Mutexes
    // -----------------------------------------------------------------------

    pub fn on_mutex_create(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.mutex_create);
        self.ensure_sync(addr, SyncKind::Mutex, tid);
    }

    pub fn on_mutex_destroy(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.mutex_destroy);
        let Some(var) = self.syncs.remove(addr) else {
            Stats::bump(&self.stats.bad_event);
            tracing::warn!(tid, addr, "destroy of an unknown sync object");
            return;
        };
        let (held, creation_stack) = {
            let mut st = var.state.lock();
            let held = st.is_held();
            st.clock.free_into(&self.pool);
            (held, st.creation_stack)
        };
        if held {
            tracing::warn!(tid, addr, "mutex destroyed while held");
            if self.cfg.report_mutex_misuse {
                self.deliver(ReportDesc {
                    addr: Some(addr),
                    tid: Some(tid),
                    stack: Some(self.host.current_stack(tid)),
                    origin_stack: Some(creation_stack),
                    ..ReportDesc::anomaly(ReportType::MutexDestroyLocked)
                });
            }
        }
    }

    pub fn on_mutex_lock(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.mutex_lock);
        let var = self.ensure_sync(addr, SyncKind::Mutex, tid);
        let pending = {
            let mut st = var.state.lock();
            match st.on_lock(tid) {
                LockOutcome::Acquired => {
                    self.acquire_into(tid, &st.clock);
                    None
                }
                LockOutcome::Recursive => {
                    Stats::bump(&self.stats.mutex_recursive_lock);
                    None
                }
                LockOutcome::BadLock { held_by } => {
                    Stats::bump(&self.stats.bad_event);
                    tracing::warn!(tid, addr, ?held_by, "lock of a mutex recorded as held");
                    // Acquiring can only pull in edges that were really
                    // released; do it even on the malformed path.
                    self.acquire_into(tid, &st.clock);
                    Some(st.creation_stack)
                }
            }
        };
        if let Some(creation_stack) = pending {
            if self.cfg.report_mutex_misuse {
                self.deliver(ReportDesc {
                    addr: Some(addr),
                    tid: Some(tid),
                    stack: Some(self.host.current_stack(tid)),
                    origin_stack: Some(creation_stack),
                    ..ReportDesc::anomaly(ReportType::MutexBadLock)
                });
            }
        }
    }

    pub fn on_mutex_unlock(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.mutex_unlock);
        let var = self.ensure_sync(addr, SyncKind::Mutex, tid);
        let pending = {
            let mut st = var.state.lock();
            match st.on_unlock(tid) {
                UnlockOutcome::Released => {
                    if !self.release_from(tid, &mut st.clock) {
                        Stats::bump(&self.stats.bad_event);
                    }
                    None
                }
                UnlockOutcome::Recursive => {
                    Stats::bump(&self.stats.mutex_recursive_unlock);
                    None
                }
                UnlockOutcome::BadUnlock { held_by } => {
                    Stats::bump(&self.stats.bad_event);
                    tracing::warn!(tid, addr, ?held_by, "unlock of a mutex not held by tid");
                    // No release: publishing here would forge an edge the
                    // analyzed program never established.
                    Some(st.creation_stack)
                }
            }
        };
        if let Some(creation_stack) = pending {
            if self.cfg.report_mutex_misuse {
                self.deliver(ReportDesc {
                    addr: Some(addr),
                    tid: Some(tid),
                    stack: Some(self.host.current_stack(tid)),
                    origin_stack: Some(creation_stack),
                    ..ReportDesc::anomaly(ReportType::MutexBadUnlock)
                });
            }
        }
    }

    pub fn on_mutex_read_lock(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.mutex_read_lock);
        let var = self.ensure_sync(addr, SyncKind::Mutex, tid);
        let mut st = var.state.lock();
        if !st.on_read_lock() {
            Stats::bump(&self.stats.bad_event);
            tracing::warn!(tid, addr, "read-lock of a write-held mutex");
        }
        // The read side is clock-neutral: readers never publish, and the
        // acquire a read lock would pair with can therefore never exist.
        // A write under a read lock stays unordered against writes under
        // the write lock.
    }

    pub fn on_mutex_read_unlock(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.mutex_read_unlock);
        let var = self.ensure_sync(addr, SyncKind::Mutex, tid);
        let pending = {
            let mut st = var.state.lock();
            match st.on_read_unlock() {
                ReadUnlockOutcome::Released => None,
                ReadUnlockOutcome::BadReadUnlock { held_by } => {
                    Stats::bump(&self.stats.bad_event);
                    tracing::warn!(tid, addr, ?held_by, "read-unlock without readers");
                    Some(st.creation_stack)
                }
            }
        };
        if let Some(creation_stack) = pending {
            if self.cfg.report_mutex_misuse {
                self.deliver(ReportDesc {
                    addr: Some(addr),
                    tid: Some(tid),
                    stack: Some(self.host.current_stack(tid)),
                    origin_stack: Some(creation_stack),
                    ..ReportDesc::anomaly(ReportType::MutexBadReadUnlock)
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Atomics
    // -----------------------------------------------------------------------

    pub fn on_atomic_acquire(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.atomic_acquire);
        let var = self.ensure_sync(addr, SyncKind::Atomic, tid);
        let st = var.state.read_lock();
        self.acquire_into(tid, &st.clock);
    }

    pub fn on_atomic_release(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.atomic_release);
        let var = self.ensure_sync(addr, SyncKind::Atomic, tid);
        let mut st = var.state.lock();
        if !self.release_from(tid, &mut st.clock) {
            Stats::bump(&self.stats.bad_event);
        }
    }

    pub fn on_atomic_acquire_release(&self, tid: Tid, _pc: u64, addr: usize) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.atomic_acq_rel);
        let var = self.ensure_sync(addr, SyncKind::Atomic, tid);
        let mut st = var.state.lock();
        let done = self
            .threads
            .with_ctx(tid, |ctx| {
                ctx.clock.tick(tid);
                clock::acq_rel(&mut ctx.clock, &mut st.clock, &self.pool);
            })
            .is_some();
        if !done {
            Stats::bump(&self.stats.bad_event);
        }
    }

    // -----------------------------------------------------------------------
    // Annotations
    // -----------------------------------------------------------------------

    pub fn on_annotation(&self, tid: Tid, _pc: u64, annotation: Annotation) {
        let Some(_rtl) = self.threads.enter(tid) else {
            return;
        };
        Stats::bump(&self.stats.annotation);
        match annotation {
            Annotation::HappensBefore { addr } => self.publish(tid, addr, SyncKind::Annotation),
            Annotation::HappensAfter { addr } => self.consume(tid, addr, SyncKind::Annotation),
            Annotation::CondVarSignal { addr } => self.publish(tid, addr, SyncKind::Condvar),
            Annotation::CondVarWait { addr } => self.consume(tid, addr, SyncKind::Condvar),
            Annotation::PcqCreate { addr } => {
                self.ensure_sync(addr, SyncKind::Queue, tid);
            }
            Annotation::PcqPut { addr } => self.publish(tid, addr, SyncKind::Queue),
            Annotation::PcqGet { addr } => self.consume(tid, addr, SyncKind::Queue),
            Annotation::PcqDestroy { addr } => {
                if let Some(var) = self.syncs.remove(addr) {
                    var.state.lock().clock.free_into(&self.pool);
                }
            }
            Annotation::BenignRace { addr, size } => {
                self.benign.lock().push((addr, size));
            }
            Annotation::IgnoreReadsBegin => self.adjust_ignore(tid, false, 1),
            Annotation::IgnoreReadsEnd => self.adjust_ignore(tid, false, -1),
            Annotation::IgnoreWritesBegin => self.adjust_ignore(tid, true, 1),
            Annotation::IgnoreWritesEnd => self.adjust_ignore(tid, true, -1),
            Annotation::NewMemory { addr, size } => self.shadow.reset_range(addr, size),
        }
    }

    fn adjust_ignore(&self, tid: Tid, writes: bool, delta: i32) {
        let adjusted = self.threads.with_ctx(tid, |ctx| {
            let counter = if writes {
                &mut ctx.ignore_writes
            } else {
                &mut ctx.ignore_reads
            };
            if delta > 0 {
                *counter += 1;
                true
            } else if *counter > 0 {
                *counter -= 1;
                true
            } else {
                false
            }
        });
        if adjusted != Some(true) {
            Stats::bump(&self.stats.bad_event);
            tracing::warn!(tid, writes, delta, "unbalanced ignore annotation");
        }
    }

    /// Tick + release onto the object at `addr` (creating it lazily).
    fn publish(&self, tid: Tid, addr: usize, kind: SyncKind) {
        let var = self.ensure_sync(addr, kind, tid);
        let mut st = var.state.lock();
        if !self.release_from(tid, &mut st.clock) {
            Stats::bump(&self.stats.bad_event);
        }
    }

    /// Acquire from the object at `addr`. A no-op if nothing was released
    /// into it yet.
    fn consume(&self, tid: Tid, addr: usize, kind: SyncKind) {
        let var = self.ensure_sync(addr, kind, tid);
        let st = var.state.read_lock();
        self.acquire_into(tid, &st.clock);
    }

    // -----------------------------------------------------------------------
    // Clock plumbing
    // -----------------------------------------------------------------------

    fn ensure_sync(&self, addr: usize, kind: SyncKind, tid: Tid) -> Arc<SyncVar> {
        self.syncs
            .ensure(addr, kind, tid, self.host.current_stack(tid))
    }

    fn acquire_into(&self, tid: Tid, sc: &SyncClock) {
        if self
            .threads
            .with_ctx(tid, |ctx| clock::acquire(&mut ctx.clock, sc))
            .is_none()
        {
            Stats::bump(&self.stats.bad_event);
        }
    }

    fn release_from(&self, tid: Tid, sc: &mut SyncClock) -> bool {
        self.threads
            .with_ctx(tid, |ctx| {
                ctx.clock.tick(tid);
                clock::release(&ctx.clock, sc, &self.pool);
            })
            .is_some()
    }

    fn deliver(&self, desc: ReportDesc) {
        if report::is_suppressed(&desc, &self.cfg.suppressions) {
            Stats::bump(&self.stats.report_suppressed);
            return;
        }
        if desc.typ == ReportType::Race {
            Stats::bump(&self.stats.race_reported);
        }
        tracing::debug!(typ = desc.typ.name(), addr = ?desc.addr, "report");
        self.host.report(&desc);
    }

    // -----------------------------------------------------------------------
    // Finalize
    // -----------------------------------------------------------------------

    /// Shutdown entry: emits thread-leak reports, reclaims clock storage,
    /// and returns the final statistics snapshot.
    pub fn finalize(&self) -> StatsSnapshot {
        Stats::raise(&self.stats.thread_max_tid, self.threads.high_water());
        if self.cfg.report_thread_leaks {
            for tid in self.threads.running_threads() {
                // The main thread outliving the process body is normal.
                if tid == MAIN_TID {
                    continue;
                }
                Stats::bump(&self.stats.thread_leak);
                self.deliver(ReportDesc {
                    tid: Some(tid),
                    ..ReportDesc::anomaly(ReportType::ThreadLeak)
                });
            }
        }
        self.syncs.drain(&self.pool);
        self.threads.reclaim_handoffs(&self.pool);
        let snapshot = self.stats.snapshot();
        tracing::info!(
            mops = snapshot.mop,
            races = snapshot.race_reported,
            bad_events = snapshot.bad_event,
            "detector finalized"
        );
        snapshot
    }

    /// Point-in-time statistics, without any of finalize's side effects.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Outstanding pooled chunks; zero after a clean finalize.
    #[must_use]
    pub fn outstanding_chunks(&self) -> u64 {
        self.pool.outstanding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CollectingHost;

    fn detector() -> (Arc<CollectingHost>, Detector) {
        let host = Arc::new(CollectingHost::new());
        let det = Detector::new(DetectorConfig::default(), host.clone()).unwrap();
        (host, det)
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = DetectorConfig {
            suppressions: vec![String::new()],
            ..DetectorConfig::default()
        };
        assert!(Detector::new(cfg, Arc::new(CollectingHost::new())).is_err());
    }

    #[test]
    fn zero_sized_access_is_ignored() {
        let (_, det) = detector();
        det.on_memory_range_init(0, 0, 0x1000, 8);
        det.on_memory_access(0, 1, 0x1000, 0, true);
        assert_eq!(det.stats().mop, 0);
    }

    #[test]
    fn untracked_access_counts_and_skips() {
        let (host, det) = detector();
        det.on_memory_access(0, 1, 0xdead_0000, 8, true);
        let snap = det.stats();
        assert_eq!(snap.mop, 1);
        assert_eq!(snap.mop_untracked, 1);
        assert_eq!(host.count(), 0);
    }

    #[test]
    fn event_for_unknown_thread_is_an_anomaly() {
        let (_, det) = detector();
        det.on_memory_range_init(0, 0, 0x1000, 8);
        det.on_memory_access(17, 1, 0x1000, 8, true);
        assert_eq!(det.stats().bad_event, 1);
    }

    #[test]
    fn finalize_reclaims_all_chunks() {
        let (_, det) = detector();
        det.on_mutex_create(0, 0, 0x10);
        det.on_mutex_lock(0, 0, 0x10);
        det.on_mutex_unlock(0, 0, 0x10);
        det.on_atomic_release(0, 0, 0x20);
        assert!(det.outstanding_chunks() > 0);
        det.finalize();
        assert_eq!(det.outstanding_chunks(), 0);
    }

    #[test]
    fn stats_count_mutex_traffic() {
        let (_, det) = detector();
        det.on_mutex_create(0, 0, 0x10);
        det.on_mutex_lock(0, 0, 0x10);
        det.on_mutex_lock(0, 0, 0x10);
        det.on_mutex_unlock(0, 0, 0x10);
        det.on_mutex_unlock(0, 0, 0x10);
        let snap = det.stats();
        assert_eq!(snap.mutex_create, 1);
        assert_eq!(snap.mutex_lock, 2);
        assert_eq!(snap.mutex_recursive_lock, 1);
        assert_eq!(snap.mutex_unlock, 2);
        assert_eq!(snap.mutex_recursive_unlock, 1);
    }
}
