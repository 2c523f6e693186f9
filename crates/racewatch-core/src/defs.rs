//! Shared constants and primitive identifier types.
//!
//! Everything here is a compile-time parameter of the detector. Sizes were
//! chosen to keep a shadow cell in one 64-bit word: 16 bits of thread id
//! and 40 bits of epoch, leaving room for the access metadata bits.

/// Analyzed-thread identifier. Assigned by the host, dense from zero.
pub type Tid = u32;

/// A thread's own logical-clock value at some moment.
pub type Epoch = u64;

/// Opaque stack-trace handle minted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub struct StackId(pub u64);

/// The main thread of the analyzed process.
pub const MAIN_TID: Tid = 0;

/// One past the highest thread id the detector can track.
///
/// Registering a thread at this index is a fatal invariant violation.
/// Must fit in [`TID_BITS`] bits so a tid packs into a shadow cell.
pub const MAX_TID: usize = 1024;

/// Slots per sync-clock chunk. Chunks are the unit of pool allocation.
pub const CHUNK_SLOTS: usize = 128;

/// Shadow cells retained per tracked byte.
pub const SHADOW_SLOTS: usize = 4;

/// log2 of the shadow page size in application bytes.
pub const SHADOW_PAGE_SHIFT: usize = 12;

/// Application bytes covered by one shadow page.
pub const SHADOW_PAGE_BYTES: usize = 1 << SHADOW_PAGE_SHIFT;

/// Capacity of the page table. Bounds total tracked memory to
/// `SHADOW_TABLE_SLOTS * SHADOW_PAGE_BYTES` bytes of application address
/// space; exhausting it is fatal (see the shadow module).
pub const SHADOW_TABLE_SLOTS: usize = 1 << 15;

/// Bits of epoch stored in a shadow cell. Epochs beyond this range are
/// unreachable in practice (one tick per release operation).
pub const EPOCH_BITS: u32 = 40;

/// Bits of thread id stored in a shadow cell.
pub const TID_BITS: u32 = 16;

const _: () = assert!(MAX_TID <= 1 << TID_BITS);
const _: () = assert!(SHADOW_TABLE_SLOTS.is_power_of_two());
