//! The character abstraction.
//!
//! A `Symbol` is an opaque, hashable, equatable value with a distinguished
//! `DUMMY` value used internally by the arena as a sentinel. Callers are
//! responsible for the convention that symbols marking the end of a string
//! (e.g. a per-allocation-record unique terminator) are never reused
//! mid-string — this is what guarantees every inserted string's terminal
//! position ends at a genuine leaf, so the tree never needs "implicit
//! suffix" bookkeeping.

use std::fmt::Debug;
use std::hash::Hash;

/// An opaque call-site code (or any other hashable token) stored on tree
/// edges.
///
/// `DUMMY` only needs to exist and be distinct in the caller's eyes; the
/// engine never inserts it into a tree, it is purely a convenience default
/// some collaborators (e.g. the trace reader) use for "no symbol yet".
pub trait Symbol: Copy + Eq + Hash + Debug {
    const DUMMY: Self;
}

impl Symbol for u64 {
    const DUMMY: Self = u64::MAX;
}

impl Symbol for u32 {
    const DUMMY: Self = u32::MAX;
}
