//! Global statistics counters.
//!
//! All counters are relaxed atomics: they are bumped from the hot path and
//! only read coherently at finalize, where they are flushed as a
//! [`StatsSnapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! stats {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        /// Live counters. Bump with [`Stats::bump`] or the field directly.
        #[derive(Debug, Default)]
        pub struct Stats {
            $($(#[$doc])* pub $name: AtomicU64,)*
        }

        /// Point-in-time copy of every counter.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
        pub struct StatsSnapshot {
            $(pub $name: u64,)*
        }

        impl Stats {
            #[must_use]
            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($name: self.$name.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

stats! {
    /// Memory accesses processed.
    mop,
    /// Reads among them.
    mop_read,
    /// Writes among them.
    mop_write,
    /// Accesses recorded with the range marker.
    mop_range,
    /// Accesses skipped because the address is untracked.
    mop_untracked,
    /// Accesses skipped by an ignore annotation.
    mop_ignored,
    /// Race reports delivered to the host.
    race_reported,
    /// Race hits filtered by the `(pc, pc')` window.
    race_deduped,
    /// Race hits filtered by a benign-race annotation.
    race_benign,
    /// Reports filtered by suppression patterns.
    report_suppressed,
    /// Memory ranges registered.
    range_init,
    /// Memory ranges freed/reset.
    range_free,
    mutex_create,
    mutex_destroy,
    mutex_lock,
    mutex_unlock,
    mutex_recursive_lock,
    mutex_recursive_unlock,
    mutex_read_lock,
    mutex_read_unlock,
    atomic_acquire,
    atomic_release,
    atomic_acq_rel,
    thread_create,
    thread_start,
    thread_finish,
    thread_join,
    /// Threads still running at finalize.
    thread_leak,
    /// Highest tid ever registered plus one.
    thread_max_tid,
    /// User annotations processed.
    annotation,
    /// Malformed host events tolerated.
    bad_event,
}

impl Stats {
    /// Relaxed increment.
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Relaxed running maximum.
    pub fn raise(counter: &AtomicU64, value: u64) {
        let mut cur = counter.load(Ordering::Relaxed);
        while cur < value {
            match counter.compare_exchange_weak(cur, value, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return,
                Err(seen) => cur = seen,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_bumps() {
        let s = Stats::default();
        Stats::bump(&s.mop);
        Stats::bump(&s.mop);
        Stats::bump(&s.race_reported);
        let snap = s.snapshot();
        assert_eq!(snap.mop, 2);
        assert_eq!(snap.race_reported, 1);
        assert_eq!(snap.mop_read, 0);
    }

    #[test]
    fn raise_keeps_maximum() {
        let s = Stats::default();
        Stats::raise(&s.thread_max_tid, 5);
        Stats::raise(&s.thread_max_tid, 3);
        Stats::raise(&s.thread_max_tid, 9);
        assert_eq!(s.snapshot().thread_max_tid, 9);
    }

    #[test]
    fn snapshot_serializes() {
        let s = Stats::default();
        Stats::bump(&s.mutex_lock);
        let json = serde_json::to_string(&s.snapshot()).unwrap();
        assert!(json.contains("\"mutex_lock\":1"));
    }
}
