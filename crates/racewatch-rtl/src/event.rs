//! The tagged event record the host produces.
//!
//! Hosts usually call the [`Detector`](crate::detector::Detector) entry
//! points directly; the enum exists so recorded streams can be replayed
//! through [`dispatch`](crate::detector::Detector::dispatch) and so tests
//! can describe scenarios as data.

use serde::{Deserialize, Serialize};

use racewatch_core::defs::Tid;

/// User annotations, mapped onto the release/acquire primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annotation {
    /// Tick + release on the object at `addr`.
    HappensBefore { addr: usize },
    /// Acquire from the object at `addr`.
    HappensAfter { addr: usize },
    /// Condvar signal: tick + release.
    CondVarSignal { addr: usize },
    /// Condvar wait completed: acquire.
    CondVarWait { addr: usize },
    PcqCreate { addr: usize },
    /// Producer edge: tick + release on the queue object.
    PcqPut { addr: usize },
    /// Consumer edge: acquire from the queue object.
    PcqGet { addr: usize },
    PcqDestroy { addr: usize },
    /// Races on `[addr, addr + size)` are expected and not reported.
    BenignRace { addr: usize, size: usize },
    IgnoreReadsBegin,
    IgnoreReadsEnd,
    IgnoreWritesBegin,
    IgnoreWritesEnd,
    /// The range holds fresh memory; prior shadow state is dropped.
    NewMemory { addr: usize, size: usize },
}

/// One host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ThreadCreate { parent: Tid, child: Tid },
    ThreadStart { parent: Tid, child: Tid },
    ThreadJoin { parent: Tid, child: Tid },
    ThreadExit { tid: Tid },
    MemoryAccess { tid: Tid, pc: u64, addr: usize, size: usize, is_write: bool },
    RangeInit { tid: Tid, pc: u64, addr: usize, size: usize },
    RangeFreed { tid: Tid, pc: u64, addr: usize, size: usize },
    MutexCreate { tid: Tid, pc: u64, addr: usize },
    MutexDestroy { tid: Tid, pc: u64, addr: usize },
    MutexLock { tid: Tid, pc: u64, addr: usize },
    MutexUnlock { tid: Tid, pc: u64, addr: usize },
    MutexReadLock { tid: Tid, pc: u64, addr: usize },
    MutexReadUnlock { tid: Tid, pc: u64, addr: usize },
    AtomicAcquire { tid: Tid, pc: u64, addr: usize },
    AtomicRelease { tid: Tid, pc: u64, addr: usize },
    AtomicAcquireRelease { tid: Tid, pc: u64, addr: usize },
    Annotation { tid: Tid, pc: u64, annotation: Annotation },
}
