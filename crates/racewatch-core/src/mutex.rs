//! Reader/writer spin-mutex for detector-internal shared state.
//!
//! Optimized for the not-so-contended case: sync-object state transitions
//! and registry lookups are short critical sections entered from many
//! analyzed threads. Readers have preference and can starve writers; the
//! common path is read-heavy and registry writes are rare.
//!
//! Backoff schedule: a small fixed count of active CPU-pause spins, then
//! cooperative yield to the OS scheduler. No fairness guarantees.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::hint;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

const UNLOCKED: usize = 0;
const WRITE_LOCK: usize = 1;
const READ_LOCK: usize = 2;

/// Active-spin iterations before falling back to `yield_now`.
const ACTIVE_SPIN_ITERS: u32 = 10;
/// Pause hints per active-spin iteration.
const ACTIVE_SPIN_CNT: u32 = 20;

/// Two-phase backoff: bounded active spin, then scheduler yield. Shared
/// with the other detector-internal wait loops.
pub(crate) struct Backoff {
    iter: u32,
}

impl Backoff {
    pub(crate) const fn new() -> Self {
        Self { iter: 0 }
    }

    pub(crate) fn wait(&mut self) {
        if self.iter < ACTIVE_SPIN_ITERS {
            self.iter += 1;
            for _ in 0..ACTIVE_SPIN_CNT {
                hint::spin_loop();
            }
        } else {
            thread::yield_now();
        }
    }
}

/// Reader/writer spin-mutex protecting a `T`.
///
/// State word: `UNLOCKED` (0), the write bit (1), or `n * READ_LOCK` for
/// `n` concurrent readers. A writer only acquires from exactly 0, so a
/// reader that has already incremented the count blocks new writers while
/// it waits for an in-flight one to leave.
pub struct RwSpinMutex<T> {
    state: AtomicUsize,
    data: UnsafeCell<T>,
}

// SAFETY: the lock protocol guarantees exclusive access through WriteGuard
// and shared access through ReadGuard.
unsafe impl<T: Send> Send for RwSpinMutex<T> {}
unsafe impl<T: Send + Sync> Sync for RwSpinMutex<T> {}

impl<T> RwSpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            state: AtomicUsize::new(UNLOCKED),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire exclusive access. Spins, then yields.
    pub fn lock(&self) -> WriteGuard<'_, T> {
        if self
            .state
            .compare_exchange(UNLOCKED, WRITE_LOCK, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return WriteGuard { mutex: self };
        }
        let mut backoff = Backoff::new();
        loop {
            backoff.wait();
            if self.state.load(Ordering::Relaxed) == UNLOCKED
                && self
                    .state
                    .compare_exchange_weak(
                        UNLOCKED,
                        WRITE_LOCK,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return WriteGuard { mutex: self };
            }
        }
    }

    /// Acquire shared access. The reader count is incremented up front; if
    /// a writer holds the lock we back off until the write bit clears.
    pub fn read_lock(&self) -> ReadGuard<'_, T> {
        let prev = self.state.fetch_add(READ_LOCK, Ordering::Acquire);
        if prev & WRITE_LOCK == 0 {
            return ReadGuard { mutex: self };
        }
        let mut backoff = Backoff::new();
        loop {
            backoff.wait();
            if self.state.load(Ordering::Acquire) & WRITE_LOCK == 0 {
                return ReadGuard { mutex: self };
            }
        }
    }

    fn unlock_write(&self) {
        let prev = self.state.fetch_sub(WRITE_LOCK, Ordering::Release);
        debug_assert_ne!(prev & WRITE_LOCK, 0);
    }

    fn unlock_read(&self) {
        let prev = self.state.fetch_sub(READ_LOCK, Ordering::Release);
        debug_assert_eq!(prev & WRITE_LOCK, 0);
        debug_assert!(prev >= READ_LOCK);
    }
}

impl<T> Drop for RwSpinMutex<T> {
    fn drop(&mut self) {
        debug_assert_eq!(self.state.load(Ordering::Relaxed), UNLOCKED);
    }
}

impl<T: Default> Default for RwSpinMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RwSpinMutex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RwSpinMutex")
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Exclusive scoped acquisition. Releases on every exit path.
pub struct WriteGuard<'a, T> {
    mutex: &'a RwSpinMutex<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the write bit is held for the guard's lifetime.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the write bit is held for the guard's lifetime.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.unlock_write();
    }
}

/// Shared scoped acquisition.
pub struct ReadGuard<'a, T> {
    mutex: &'a RwSpinMutex<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the reader count is held for the guard's lifetime and
        // excludes writers.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.unlock_read();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn uncontended_write_lock() {
        let m = RwSpinMutex::new(7u32);
        {
            let mut g = m.lock();
            *g += 1;
        }
        assert_eq!(*m.lock(), 8);
    }

    #[test]
    fn readers_share() {
        let m = RwSpinMutex::new(5u32);
        let r1 = m.read_lock();
        let r2 = m.read_lock();
        assert_eq!(*r1, 5);
        assert_eq!(*r2, 5);
    }

    #[test]
    fn write_excludes_concurrent_increments() {
        const THREADS: usize = 8;
        const ITERS: usize = 10_000;
        let m = Arc::new(RwSpinMutex::new(0u64));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    for _ in 0..ITERS {
                        *m.lock() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*m.lock(), (THREADS * ITERS) as u64);
    }

    #[test]
    fn readers_observe_writer_results() {
        let m = Arc::new(RwSpinMutex::new(0u64));
        let writer = {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                for i in 1..=1000u64 {
                    *m.lock() = i;
                }
            })
        };
        let reader = {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                let mut last = 0u64;
                for _ in 0..1000 {
                    let v = *m.read_lock();
                    assert!(v >= last, "value went backwards: {v} < {last}");
                    last = v;
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }

    #[test]
    fn guard_releases_on_panic() {
        let m = Arc::new(RwSpinMutex::new(0u32));
        let m2 = Arc::clone(&m);
        let res = thread::spawn(move || {
            let _g = m2.lock();
            panic!("poisoned on purpose");
        })
        .join();
        assert!(res.is_err());
        // The lock must be free again.
        *m.lock() = 1;
        assert_eq!(*m.read_lock(), 1);
    }
}
