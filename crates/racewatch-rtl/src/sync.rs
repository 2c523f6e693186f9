//! Sync-object descriptors and the global address registry.
//!
//! Every synchronization primitive the host reports on (mutex, atomic
//! location, condvar, queue, annotation object) gets a descriptor keyed
//! by its user address: the object's sync clock, its lock state, and
//! creation metadata. Descriptors are created lazily on first touch and
//! destroyed on the explicit destroy event.
//!
//! The lock state machine is a pure transition function over
//! [`SyncState`]; the dispatcher performs the clock transfers the returned
//! outcome calls for. Malformed transitions (double lock, unlock of an
//! unheld mutex) are surfaced as outcomes, and the state is resynced to
//! what the host's runtime actually did: the host only reports lock
//! operations that succeeded, so a contradiction means we missed an event,
//! not that the analyzed program holds two write locks at once.

use std::collections::HashMap;
use std::sync::Arc;

use racewatch_core::clock::SyncClock;
use racewatch_core::defs::{StackId, Tid};
use racewatch_core::mutex::RwSpinMutex;
use racewatch_core::slab::ChunkPool;

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// What kind of primitive a descriptor stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SyncKind {
    Mutex,
    Atomic,
    Condvar,
    Queue,
    /// HappensBefore/HappensAfter annotation object.
    Annotation,
}

/// Lock state of a mutex descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    WriteHeld { owner: Tid, recursion: u32 },
    ReadHeld { readers: u32 },
}

/// Mutable half of a descriptor, behind the per-object mutex.
pub struct SyncState {
    pub clock: SyncClock,
    pub lock: LockState,
    pub kind: SyncKind,
    pub creation_tid: Tid,
    pub creation_stack: StackId,
}

/// One registered sync object.
pub struct SyncVar {
    pub addr: usize,
    pub state: RwSpinMutex<SyncState>,
}

// ---------------------------------------------------------------------------
// Lock transitions
// ---------------------------------------------------------------------------

/// What a write-lock event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// Fresh acquisition: consume a release edge (acquire the clock).
    Acquired,
    /// Recursive re-lock by the owner: no clock transfer.
    Recursive,
    /// Contradicts the recorded state; state was forced to held-by-`me`.
    BadLock { held_by: LockState },
}

/// What a write-unlock event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// Last unlock by the owner: tick and publish (release edge).
    Released,
    /// Recursion count dropped: no clock transfer.
    Recursive,
    /// The thread did not hold the lock; state was forced to unlocked and
    /// no clock is published.
    BadUnlock { held_by: LockState },
}

/// What a read-unlock event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadUnlockOutcome {
    /// Reader count dropped; reads never publish.
    Released,
    /// No readers were recorded.
    BadReadUnlock { held_by: LockState },
}

impl SyncState {
    fn new(kind: SyncKind, creation_tid: Tid, creation_stack: StackId) -> Self {
        Self {
            clock: SyncClock::new(),
            lock: LockState::Unlocked,
            kind,
            creation_tid,
            creation_stack,
        }
    }

    /// Write-lock transition for thread `me`.
    pub fn on_lock(&mut self, me: Tid) -> LockOutcome {
        match self.lock {
            LockState::Unlocked => {
                self.lock = LockState::WriteHeld {
                    owner: me,
                    recursion: 1,
                };
                LockOutcome::Acquired
            }
            LockState::WriteHeld { owner, recursion } if owner == me => {
                self.lock = LockState::WriteHeld {
                    owner,
                    recursion: recursion + 1,
                };
                LockOutcome::Recursive
            }
            held => {
                self.lock = LockState::WriteHeld {
                    owner: me,
                    recursion: 1,
                };
                LockOutcome::BadLock { held_by: held }
            }
        }
    }

    /// Write-unlock transition for thread `me`.
    pub fn on_unlock(&mut self, me: Tid) -> UnlockOutcome {
        match self.lock {
            LockState::WriteHeld { owner, recursion } if owner == me => {
                if recursion > 1 {
                    self.lock = LockState::WriteHeld {
                        owner,
                        recursion: recursion - 1,
                    };
                    UnlockOutcome::Recursive
                } else {
                    self.lock = LockState::Unlocked;
                    UnlockOutcome::Released
                }
            }
            held => {
                self.lock = LockState::Unlocked;
                UnlockOutcome::BadUnlock { held_by: held }
            }
        }
    }

    /// Read-lock transition. Clock-neutral (see the dispatcher); only the
    /// reader count changes.
    pub fn on_read_lock(&mut self) -> bool {
        match self.lock {
            LockState::Unlocked => {
                self.lock = LockState::ReadHeld { readers: 1 };
                true
            }
            LockState::ReadHeld { readers } => {
                self.lock = LockState::ReadHeld {
                    readers: readers + 1,
                };
                true
            }
            // Missed unlock somewhere; recover as a single reader.
            LockState::WriteHeld { .. } => {
                self.lock = LockState::ReadHeld { readers: 1 };
                false
            }
        }
    }

    /// Read-unlock transition. Reads never publish.
    pub fn on_read_unlock(&mut self) -> ReadUnlockOutcome {
        match self.lock {
            LockState::ReadHeld { readers } if readers > 1 => {
                self.lock = LockState::ReadHeld {
                    readers: readers - 1,
                };
                ReadUnlockOutcome::Released
            }
            LockState::ReadHeld { .. } => {
                self.lock = LockState::Unlocked;
                ReadUnlockOutcome::Released
            }
            held => ReadUnlockOutcome::BadReadUnlock { held_by: held },
        }
    }

    /// True when destroy arrives while the object is held.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.lock != LockState::Unlocked
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Global user-address → descriptor table.
///
/// Coarse reader/writer mutex for lookup and insert; every state
/// transition goes through the descriptor's own mutex.
#[derive(Default)]
pub struct SyncRegistry {
    table: RwSpinMutex<HashMap<usize, Arc<SyncVar>>>,
}

impl SyncRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the descriptor for `addr`, creating it on first touch.
    pub fn ensure(
        &self,
        addr: usize,
        kind: SyncKind,
        creation_tid: Tid,
        creation_stack: StackId,
    ) -> Arc<SyncVar> {
        if let Some(var) = self.table.read_lock().get(&addr) {
            return Arc::clone(var);
        }
        let mut table = self.table.lock();
        Arc::clone(table.entry(addr).or_insert_with(|| {
            Arc::new(SyncVar {
                addr,
                state: RwSpinMutex::new(SyncState::new(kind, creation_tid, creation_stack)),
            })
        }))
    }

    /// Descriptor for `addr` if one exists.
    #[must_use]
    pub fn get(&self, addr: usize) -> Option<Arc<SyncVar>> {
        self.table.read_lock().get(&addr).map(Arc::clone)
    }

    /// Unregisters `addr`. The caller frees the clock chunks.
    pub fn remove(&self, addr: usize) -> Option<Arc<SyncVar>> {
        self.table.lock().remove(&addr)
    }

    /// Unregisters everything, returning each clock's chunks to the pool.
    /// Finalize-time cleanup.
    pub fn drain(&self, pool: &ChunkPool) -> usize {
        let vars: Vec<Arc<SyncVar>> = self.table.lock().drain().map(|(_, v)| v).collect();
        let n = vars.len();
        for var in vars {
            var.state.lock().clock.free_into(pool);
        }
        n
    }

    /// Live descriptor count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read_lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
