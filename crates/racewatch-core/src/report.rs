//! Report descriptors, pair deduplication, and suppression matching.
//!
//! The core never formats or prints: it builds a structured [`ReportDesc`]
//! and hands it to the host, which owns symbolization and user I/O. Race
//! reports are deduplicated by their `(pc, pc')` pair inside a bounded
//! window so one hot pair cannot storm the log.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

use crate::defs::{Epoch, StackId, Tid};
use crate::glob;

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// What kind of finding a report carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReportType {
    /// Two unordered conflicting accesses.
    Race,
    /// A thread still running at finalize.
    ThreadLeak,
    /// Destroy of a mutex in a held state.
    MutexDestroyLocked,
    /// Lock observed while the mutex was held by another thread.
    MutexBadLock,
    /// Unlock of a mutex the thread does not hold.
    MutexBadUnlock,
    /// Read-unlock of a mutex with no readers (or write-held).
    MutexBadReadUnlock,
}

impl ReportType {
    /// Stable name, also the subject of suppression matching.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Race => "data-race",
            Self::ThreadLeak => "thread-leak",
            Self::MutexDestroyLocked => "mutex-destroy-locked",
            Self::MutexBadLock => "mutex-bad-lock",
            Self::MutexBadUnlock => "mutex-bad-unlock",
            Self::MutexBadReadUnlock => "mutex-bad-read-unlock",
        }
    }
}

/// One memory operation cited by a race report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportMop {
    pub tid: Tid,
    pub epoch: Epoch,
    pub addr: usize,
    pub size: usize,
    pub is_write: bool,
    /// Absent for a recovered prior access whose pc was not retained.
    pub pc: Option<u64>,
    pub stack: Option<StackId>,
}

/// Structured race/anomaly descriptor delivered to the host.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDesc {
    pub typ: ReportType,
    /// Current access first, then the prior access. Empty for anomalies.
    pub mops: Vec<ReportMop>,
    /// Sync object or location address, when one is the subject.
    pub addr: Option<usize>,
    /// Subject thread (leaked thread, offending locker, ...).
    pub tid: Option<Tid>,
    /// Stack at the reporting site.
    pub stack: Option<StackId>,
    /// Creation stack of the involved sync object.
    pub origin_stack: Option<StackId>,
}

impl ReportDesc {
    #[must_use]
    pub fn anomaly(typ: ReportType) -> Self {
        Self {
            typ,
            mops: Vec::new(),
            addr: None,
            tid: None,
            stack: None,
            origin_stack: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

struct DedupWindow {
    seen: HashSet<(u64, u64)>,
    order: VecDeque<(u64, u64)>,
}

/// Bounded-window `(pc, pc')` pair filter.
///
/// Pairs are normalized so the two orientations of the same race collapse.
/// When the window is full the oldest pair is forgotten and may report
/// again later; that bound is what keeps a long run from pinning memory.
pub struct PairDedup {
    window: Mutex<DedupWindow>,
    cap: usize,
}

impl PairDedup {
    /// `cap == 0` disables deduplication entirely.
    #[must_use]
    pub fn new(cap: usize) -> Self {
        Self {
            window: Mutex::new(DedupWindow {
                seen: HashSet::new(),
                order: VecDeque::new(),
            }),
            cap,
        }
    }

    /// Records the pair; returns true when it was not already in the
    /// window (i.e. the report should be emitted).
    pub fn insert(&self, a: u64, b: u64) -> bool {
        if self.cap == 0 {
            return true;
        }
        let key = if a <= b { (a, b) } else { (b, a) };
        let mut w = self.window.lock();
        if !w.seen.insert(key) {
            return false;
        }
        w.order.push_back(key);
        if w.order.len() > self.cap {
            if let Some(old) = w.order.pop_front() {
                w.seen.remove(&old);
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Suppressions
// ---------------------------------------------------------------------------

/// Returns true when any pattern matches the report's kind name.
#[must_use]
pub fn is_suppressed(desc: &ReportDesc, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|pat| glob::matches(pat, desc.typ.name()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
