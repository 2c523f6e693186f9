//! # racewatch-core
//!
//! Happens-before mechanisms of the racewatch data-race detector: the
//! vector-clock algebra, the reader/writer spin-mutex, pooled sync-clock
//! storage, shadow memory with the race decision procedure, report
//! descriptors, and supporting utilities (glob matching, statistics).
//!
//! Policy (which events drive these mechanisms and how the state machines
//! use them) lives in `racewatch-rtl`. `unsafe` is confined to the
//! modules that need raw cell/page access.

#![deny(unsafe_code)]

pub mod clock;
pub mod defs;
pub mod glob;
#[allow(unsafe_code)]
pub mod mutex;
pub mod report;
#[allow(unsafe_code)]
pub mod shadow;
pub mod slab;
pub mod stats;
