//! Per-lane scalar contract.
//!
//! `LaneScalar` is implemented for the integer and float widths the vertex
//! programs use. Every arithmetic helper here is sentinel-aware: adding
//! anything to [`LaneScalar::INFINITY`] stays at infinity, and finite sums
//! clamp instead of wrapping.

use std::fmt::{Debug, Display};
use bytes::{Buf, BufMut};
use serde::{de::DeserializeOwned, Serialize};

/// A scalar that can live in one lane of a [`super::LaneVector`].
pub trait LaneScalar:
    Copy + PartialOrd + Debug + Display + Default + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Encoded width of one lane on the wire, in bytes.
    const BYTES: usize;
    /// "Infinity" sentinel: the maximum representable value.
    const INFINITY: Self;
    /// The minimum representable value (identity of `max`).
    const NEG_INFINITY: Self;
    const ZERO: Self;
    const ONE: Self;

    /// `self + rhs`, clamped to the representable range. Infinity absorbs.
    fn clamped_add(self, rhs: Self) -> Self;

    /// `self - rhs`, clamped to the representable range. Infinity absorbs.
    fn clamped_sub(self, rhs: Self) -> Self;

    /// `self * rhs`, clamped to the representable range.
    fn clamped_mul(self, rhs: Self) -> Self;

    /// Bitwise OR over the raw lane bits.
    fn bit_or(self, rhs: Self) -> Self;

    /// Bitwise AND over the raw lane bits.
    fn bit_and(self, rhs: Self) -> Self;

    /// Write the little-endian encoding of this lane.
    fn put_le<B: BufMut>(self, out: &mut B);

    /// Read one little-endian lane. The caller guarantees `BYTES` remain.
    fn get_le<B: Buf>(src: &mut B) -> Self;

    /// True if this lane holds the infinity sentinel.
    #[inline]
    fn is_infinite(self) -> bool {
        self == Self::INFINITY
    }

    #[inline]
    fn lane_min(self, rhs: Self) -> Self {
        if rhs < self { rhs } else { self }
    }

    #[inline]
    fn lane_max(self, rhs: Self) -> Self {
        if rhs > self { rhs } else { self }
    }
}

macro_rules! impl_int_scalar {
    ($t:ty, $put:ident, $get:ident) => {
        impl LaneScalar for $t {
            const BYTES: usize = std::mem::size_of::<$t>();
            const INFINITY: Self = <$t>::MAX;
            const NEG_INFINITY: Self = <$t>::MIN;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline]
            fn clamped_add(self, rhs: Self) -> Self {
                if self == Self::INFINITY || rhs == Self::INFINITY {
                    return Self::INFINITY;
                }
                self.saturating_add(rhs)
            }

            #[inline]
            fn clamped_sub(self, rhs: Self) -> Self {
                if self == Self::INFINITY {
                    return Self::INFINITY;
                }
                self.saturating_sub(rhs)
            }

            #[inline]
            fn clamped_mul(self, rhs: Self) -> Self {
                self.saturating_mul(rhs)
            }

            #[inline]
            fn bit_or(self, rhs: Self) -> Self {
                self | rhs
            }

            #[inline]
            fn bit_and(self, rhs: Self) -> Self {
                self & rhs
            }

            #[inline]
            fn put_le<B: BufMut>(self, out: &mut B) {
                out.$put(self);
            }

            #[inline]
            fn get_le<B: Buf>(src: &mut B) -> Self {
                src.$get()
            }
        }
    };
}

macro_rules! impl_float_scalar {
    ($t:ty, $put:ident, $get:ident) => {
        impl LaneScalar for $t {
            const BYTES: usize = std::mem::size_of::<$t>();
            const INFINITY: Self = <$t>::MAX;
            const NEG_INFINITY: Self = <$t>::MIN;
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            #[inline]
            fn clamped_add(self, rhs: Self) -> Self {
                if self == <$t as LaneScalar>::INFINITY || rhs == <$t as LaneScalar>::INFINITY {
                    return <$t as LaneScalar>::INFINITY;
                }
                (self + rhs).clamp(<$t as LaneScalar>::NEG_INFINITY, <$t as LaneScalar>::INFINITY)
            }

            #[inline]
            fn clamped_sub(self, rhs: Self) -> Self {
                if self == <$t as LaneScalar>::INFINITY {
                    return <$t as LaneScalar>::INFINITY;
                }
                (self - rhs).clamp(<$t as LaneScalar>::NEG_INFINITY, <$t as LaneScalar>::INFINITY)
            }

            #[inline]
            fn clamped_mul(self, rhs: Self) -> Self {
                (self * rhs).clamp(<$t as LaneScalar>::NEG_INFINITY, <$t as LaneScalar>::INFINITY)
            }

            #[inline]
            fn bit_or(self, rhs: Self) -> Self {
                <$t>::from_bits(self.to_bits() | rhs.to_bits())
            }

            #[inline]
            fn bit_and(self, rhs: Self) -> Self {
                <$t>::from_bits(self.to_bits() & rhs.to_bits())
            }

            #[inline]
            fn put_le<B: BufMut>(self, out: &mut B) {
                out.$put(self);
            }

            #[inline]
            fn get_le<B: Buf>(src: &mut B) -> Self {
                src.$get()
            }
        }
    };
}

impl_int_scalar!(i32, put_i32_le, get_i32_le);
impl_int_scalar!(i64, put_i64_le, get_i64_le);
impl_int_scalar!(u32, put_u32_le, get_u32_le);
impl_int_scalar!(u64, put_u64_le, get_u64_le);
impl_float_scalar!(f32, put_f32_le, get_f32_le);
impl_float_scalar!(f64, put_f64_le, get_f64_le);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinity_absorbs_addition() {
        assert_eq!(i32::INFINITY.clamped_add(7), i32::INFINITY);
        assert_eq!(5i32.clamped_add(i32::INFINITY), i32::INFINITY);
        // negative weights must not pull the sentinel back into range
        assert_eq!(i32::INFINITY.clamped_add(-3), i32::INFINITY);
    }

    #[test]
    fn near_sentinel_add_clamps_instead_of_wrapping() {
        assert_eq!((i32::MAX - 1).clamped_add(10), i32::MAX);
        assert_eq!((u64::MAX - 2).clamped_add(5), u64::MAX);
        assert_eq!(f64::MAX.clamped_add(1.0e300), f64::MAX);
        assert_eq!((f64::MAX / 2.0).clamped_add(f64::MAX), f64::MAX);
        assert_eq!(f32::MAX.clamped_mul(2.0), f32::MAX);
        assert_eq!(f64::MIN.clamped_sub(1.0e300), f64::MIN);
    }

    #[test]
    fn float_bit_ops_are_raw() {
        let a = f32::from_bits(0b0101);
        let b = f32::from_bits(0b0011);
        assert_eq!(a.bit_or(b).to_bits(), 0b0111);
        assert_eq!(a.bit_and(b).to_bits(), 0b0001);
    }

    #[test]
    fn little_endian_round_trip() {
        let mut buf = Vec::new();
        (-42i64).put_le(&mut buf);
        assert_eq!(buf.len(), i64::BYTES);
        let mut src = &buf[..];
        assert_eq!(i64::get_le(&mut src), -42);
    }
}
