//! # Lane Containers
//!
//! Fixed-capacity, per-query containers. A *lane* is the slot of one query
//! instance; every container used together in a run has the same lane count K.
//!
//! | Type | Storage | Purpose |
//! |------|---------|---------|
//! | `LaneVector<T>` | `Vec<T>`, one scalar per lane | per-query vertex state, message deltas |
//! | `LaneMask` | packed `u64` words, one bit per lane | active / changed / to-send lanes |
//!
//! Bit i of a mask always refers to element i of any vector used alongside it.
//! Binary and masked operations require identical lane counts on all operands;
//! a mismatch is a programming error and panics (see [`check_lanes`]).

pub mod scalar;
pub mod mask;
pub mod vector;
pub mod codec;

pub use scalar::LaneScalar;
pub use mask::LaneMask;
pub use vector::LaneVector;

/// Assert that two cooperating lane containers agree on their lane count.
///
/// # Panics
///
/// Panics with a diagnostic naming `op` when `expected != got`. Capacity
/// mismatches never truncate or pad.
#[inline]
#[track_caller]
pub fn check_lanes(op: &str, expected: usize, got: usize) {
    assert!(
        expected == got,
        "lane-count mismatch in {op}: expected {expected} lanes, got {got}"
    );
}
