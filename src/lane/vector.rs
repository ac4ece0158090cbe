//! `LaneVector<T>` — K per-query scalars with masked elementwise operations.
//!
//! Every `*_masked` operation leaves lanes outside the mask untouched, and
//! every comparison returns a [`LaneMask`] whose bits outside an optional
//! restricting mask are forced to 0.

use serde::{Deserialize, Serialize};

use super::{check_lanes, LaneMask, LaneScalar};

/// Fixed-capacity array of per-lane scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: LaneScalar")]
pub struct LaneVector<T: LaneScalar> {
    values: Vec<T>,
}

impl<T: LaneScalar> LaneVector<T> {
    /// `lanes` lanes, each `T::default()`.
    pub fn new(lanes: usize) -> Self {
        Self::filled(lanes, T::default())
    }

    /// `lanes` lanes, each `v`.
    pub fn filled(lanes: usize, v: T) -> Self {
        Self { values: vec![v; lanes] }
    }

    /// Take ownership of an existing buffer; its length is the lane count.
    pub fn from_vec(values: Vec<T>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn lanes(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    pub fn set_all(&mut self, v: T) {
        self.values.iter_mut().for_each(|x| *x = v);
    }

    /// # Panics
    ///
    /// Panics if `lane` is out of range.
    #[inline]
    #[track_caller]
    pub fn set_single(&mut self, v: T, lane: usize) {
        self.values[lane] = v;
    }

    /// # Panics
    ///
    /// Panics if `lane` is out of range.
    #[inline]
    #[track_caller]
    pub fn get_single(&self, lane: usize) -> T {
        self.values[lane]
    }

    // ========================================================================
    // Internal zips
    // ========================================================================

    #[inline]
    #[track_caller]
    fn zip_apply(&mut self, op: &str, other: &LaneVector<T>, f: impl Fn(T, T) -> T) {
        check_lanes(op, self.lanes(), other.lanes());
        for (a, &b) in self.values.iter_mut().zip(other.values.iter()) {
            *a = f(*a, b);
        }
    }

    #[inline]
    #[track_caller]
    fn zip_apply_masked(
        &mut self,
        op: &str,
        other: &LaneVector<T>,
        mask: &LaneMask,
        f: impl Fn(T, T) -> T,
    ) {
        check_lanes(op, self.lanes(), other.lanes());
        check_lanes(op, self.lanes(), mask.lanes());
        for lane in mask.iter_set() {
            self.values[lane] = f(self.values[lane], other.values[lane]);
        }
    }

    #[inline]
    #[track_caller]
    fn compare(
        &self,
        op: &str,
        other: &LaneVector<T>,
        within: Option<&LaneMask>,
        pred: impl Fn(T, T) -> bool,
    ) -> LaneMask {
        check_lanes(op, self.lanes(), other.lanes());
        let mut out = LaneMask::new(self.lanes());
        for (lane, (&a, &b)) in self.values.iter().zip(other.values.iter()).enumerate() {
            if pred(a, b) {
                out.set_bit(lane);
            }
        }
        if let Some(mask) = within {
            check_lanes(op, self.lanes(), mask.lanes());
            out.and_assign(mask);
        }
        out
    }

    // ========================================================================
    // Pairwise elementwise ops
    // ========================================================================

    pub fn min_with(&mut self, other: &LaneVector<T>) {
        self.zip_apply("LaneVector::min_with", other, T::lane_min);
    }

    pub fn min_with_masked(&mut self, other: &LaneVector<T>, mask: &LaneMask) {
        self.zip_apply_masked("LaneVector::min_with_masked", other, mask, T::lane_min);
    }

    pub fn max_with(&mut self, other: &LaneVector<T>) {
        self.zip_apply("LaneVector::max_with", other, T::lane_max);
    }

    pub fn max_with_masked(&mut self, other: &LaneVector<T>, mask: &LaneMask) {
        self.zip_apply_masked("LaneVector::max_with_masked", other, mask, T::lane_max);
    }

    /// Sentinel-clamped add.
    pub fn add_with(&mut self, other: &LaneVector<T>) {
        self.zip_apply("LaneVector::add_with", other, T::clamped_add);
    }

    pub fn add_with_masked(&mut self, other: &LaneVector<T>, mask: &LaneMask) {
        self.zip_apply_masked("LaneVector::add_with_masked", other, mask, T::clamped_add);
    }

    pub fn sub_with(&mut self, other: &LaneVector<T>) {
        self.zip_apply("LaneVector::sub_with", other, T::clamped_sub);
    }

    pub fn sub_with_masked(&mut self, other: &LaneVector<T>, mask: &LaneMask) {
        self.zip_apply_masked("LaneVector::sub_with_masked", other, mask, T::clamped_sub);
    }

    pub fn mul_with(&mut self, other: &LaneVector<T>) {
        self.zip_apply("LaneVector::mul_with", other, T::clamped_mul);
    }

    pub fn mul_with_masked(&mut self, other: &LaneVector<T>, mask: &LaneMask) {
        self.zip_apply_masked("LaneVector::mul_with_masked", other, mask, T::clamped_mul);
    }

    /// Lane-wise bitwise OR (flag and color-set lanes).
    pub fn or_with(&mut self, other: &LaneVector<T>) {
        self.zip_apply("LaneVector::or_with", other, T::bit_or);
    }

    pub fn or_with_masked(&mut self, other: &LaneVector<T>, mask: &LaneMask) {
        self.zip_apply_masked("LaneVector::or_with_masked", other, mask, T::bit_or);
    }

    // ========================================================================
    // Scalar and blend ops
    // ========================================================================

    /// Add `v` to every lane. Infinite lanes stay infinite.
    pub fn add_scalar(&mut self, v: T) {
        self.values.iter_mut().for_each(|x| *x = x.clamped_add(v));
    }

    pub fn add_scalar_masked(&mut self, v: T, mask: &LaneMask) {
        check_lanes("LaneVector::add_scalar_masked", self.lanes(), mask.lanes());
        for lane in mask.iter_set() {
            self.values[lane] = self.values[lane].clamped_add(v);
        }
    }

    pub fn mul_scalar(&mut self, v: T) {
        self.values.iter_mut().for_each(|x| *x = x.clamped_mul(v));
    }

    /// Clamp every lane into `[lo, hi]`.
    pub fn clamp(&mut self, lo: T, hi: T) {
        for x in self.values.iter_mut() {
            if *x < lo {
                *x = lo;
            } else if *x > hi {
                *x = hi;
            }
        }
    }

    /// Copy `other`'s lanes into `self` where `mask` is set.
    pub fn set_masked(&mut self, other: &LaneVector<T>, mask: &LaneMask) {
        self.zip_apply_masked("LaneVector::set_masked", other, mask, |_, b| b);
    }

    /// Write `v` into every masked lane.
    pub fn fill_masked(&mut self, v: T, mask: &LaneMask) {
        check_lanes("LaneVector::fill_masked", self.lanes(), mask.lanes());
        for lane in mask.iter_set() {
            self.values[lane] = v;
        }
    }

    // ========================================================================
    // Comparisons
    // ========================================================================

    /// Lanes where `self > other`, restricted to `within` if given.
    pub fn gt_mask(&self, other: &LaneVector<T>, within: Option<&LaneMask>) -> LaneMask {
        self.compare("LaneVector::gt_mask", other, within, |a, b| a > b)
    }

    /// Lanes where `self < other`, restricted to `within` if given.
    pub fn lt_mask(&self, other: &LaneVector<T>, within: Option<&LaneMask>) -> LaneMask {
        self.compare("LaneVector::lt_mask", other, within, |a, b| a < b)
    }

    /// Lanes where `self != other`, restricted to `within` if given.
    pub fn ne_mask(&self, other: &LaneVector<T>, within: Option<&LaneMask>) -> LaneMask {
        self.compare("LaneVector::ne_mask", other, within, |a, b| a != b)
    }

    pub fn eq_mask(&self, other: &LaneVector<T>, within: Option<&LaneMask>) -> LaneMask {
        self.compare("LaneVector::eq_mask", other, within, |a, b| a == b)
    }
}

impl LaneVector<u64> {
    /// Per lane, the lowest bit that is *not* set in the lane's value, as a
    /// one-hot word. A lane holding `u64::MAX` has no unset bit and yields 0.
    pub fn lowest_unset_bit(&self) -> LaneVector<u64> {
        LaneVector::from_vec(self.values.iter().map(|&acc| !acc & acc.wrapping_add(1)).collect())
    }

    /// `self &= !other` lane-wise.
    pub fn and_not_bits(&mut self, other: &LaneVector<u64>) {
        self.zip_apply("LaneVector::and_not_bits", other, |a, b| a & !b);
    }
}

// ============================================================================
// Tests
// ============================================================================
