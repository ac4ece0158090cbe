//! `LaneMask` — one bit per lane, packed into `u64` words.
//!
//! Bits past the lane count in the last word are kept at zero at all times,
//! so whole-word tests (`all_zero`, equality) are exact without per-bit loops.

use std::fmt;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::check_lanes;

const WORD_BITS: usize = 64;

/// Packed boolean-per-lane set.
///
/// Up to 128 lanes are stored inline.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMask")]
pub struct LaneMask {
    lanes: usize,
    words: SmallVec<[u64; 2]>,
}

/// Unchecked serde form of [`LaneMask`].
#[derive(Deserialize)]
struct RawMask {
    lanes: usize,
    words: SmallVec<[u64; 2]>,
}

impl TryFrom<RawMask> for LaneMask {
    type Error = String;

    fn try_from(raw: RawMask) -> Result<Self, Self::Error> {
        let expected = word_count(raw.lanes);
        if raw.words.len() != expected {
            return Err(format!(
                "LaneMask: {} lanes need {expected} words, got {}",
                raw.lanes,
                raw.words.len()
            ));
        }
        Ok(LaneMask::from_words(raw.lanes, raw.words))
    }
}

#[inline]
fn word_count(lanes: usize) -> usize {
    lanes.div_ceil(WORD_BITS)
}

#[inline]
fn bit_pos(lane: usize) -> (usize, u64) {
    (lane / WORD_BITS, 1u64 << (lane % WORD_BITS))
}

impl LaneMask {
    /// All-zero mask over `lanes` lanes.
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes,
            words: SmallVec::from_elem(0, word_count(lanes)),
        }
    }

    /// All-one mask over `lanes` lanes.
    pub fn full(lanes: usize) -> Self {
        let mut mask = Self::new(lanes);
        mask.set_all(true);
        mask
    }

    /// Mask with exactly the listed lanes set.
    ///
    /// # Panics
    ///
    /// Panics if any lane is out of range.
    pub fn from_lanes(lanes: usize, set: impl IntoIterator<Item = usize>) -> Self {
        let mut mask = Self::new(lanes);
        for lane in set {
            mask.set_bit(lane);
        }
        mask
    }

    /// Mask with a single lane set.
    pub fn single(lanes: usize, lane: usize) -> Self {
        Self::from_lanes(lanes, [lane])
    }

    /// Rebuild a mask from packed words, clearing tail bits.
    pub(crate) fn from_words(lanes: usize, words: impl IntoIterator<Item = u64>) -> Self {
        let mut mask = Self {
            lanes,
            words: words.into_iter().collect(),
        };
        mask.words.resize(word_count(lanes), 0);
        mask.clear_tail();
        mask
    }

    /// Number of lanes (not the number of set bits).
    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// The packed words; bit i of word i/64 is lane i.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    #[track_caller]
    fn check_lane(&self, lane: usize) {
        assert!(lane < self.lanes, "lane {lane} out of range for {} lanes", self.lanes);
    }

    #[inline]
    fn clear_tail(&mut self) {
        let rem = self.lanes % WORD_BITS;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    #[inline]
    #[track_caller]
    pub fn test_bit(&self, lane: usize) -> bool {
        self.check_lane(lane);
        let (w, bit) = bit_pos(lane);
        self.words[w] & bit != 0
    }

    #[inline]
    #[track_caller]
    pub fn set_bit(&mut self, lane: usize) {
        self.check_lane(lane);
        let (w, bit) = bit_pos(lane);
        self.words[w] |= bit;
    }

    #[inline]
    #[track_caller]
    pub fn unset_bit(&mut self, lane: usize) {
        self.check_lane(lane);
        let (w, bit) = bit_pos(lane);
        self.words[w] &= !bit;
    }

    /// Set or clear one lane.
    #[inline]
    pub fn assign_bit(&mut self, lane: usize, val: bool) {
        if val { self.set_bit(lane) } else { self.unset_bit(lane) }
    }

    pub fn set_all(&mut self, val: bool) {
        let fill = if val { u64::MAX } else { 0 };
        self.words.iter_mut().for_each(|w| *w = fill);
        self.clear_tail();
    }

    /// True if no lane is set. Word-level test.
    #[inline]
    pub fn all_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    #[inline]
    pub fn any(&self) -> bool {
        !self.all_zero()
    }

    /// Number of set lanes.
    pub fn count_set(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Lowest set lane, if any.
    pub fn first_set(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + w.trailing_zeros() as usize)
    }

    /// Iterate the indices of set lanes in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(i * WORD_BITS + bit)
            })
        })
    }

    // ========================================================================
    // In-place logic
    // ========================================================================

    #[inline]
    fn zip_words(&mut self, op: &str, other: &LaneMask, f: impl Fn(u64, u64) -> u64) {
        check_lanes(op, self.lanes, other.lanes);
        for (a, &b) in self.words.iter_mut().zip(other.words.iter()) {
            *a = f(*a, b);
        }
    }

    /// `self |= other`
    pub fn or_assign(&mut self, other: &LaneMask) {
        self.zip_words("LaneMask::or_assign", other, |a, b| a | b);
    }

    /// `self &= other`
    pub fn and_assign(&mut self, other: &LaneMask) {
        self.zip_words("LaneMask::and_assign", other, |a, b| a & b);
    }

    /// `self &= !other`
    pub fn and_not_assign(&mut self, other: &LaneMask) {
        self.zip_words("LaneMask::and_not_assign", other, |a, b| a & !b);
    }

    /// Flip every lane.
    pub fn negate(&mut self) {
        self.words.iter_mut().for_each(|w| *w = !*w);
        self.clear_tail();
    }

    /// Copy `other`'s bits into `self` only where `mask` is set.
    pub fn set_from(&mut self, other: &LaneMask, mask: &LaneMask) {
        check_lanes("LaneMask::set_from", self.lanes, other.lanes);
        check_lanes("LaneMask::set_from (mask)", self.lanes, mask.lanes);
        for ((a, &b), &m) in self.words.iter_mut().zip(other.words.iter()).zip(mask.words.iter()) {
            *a = (*a & !m) | (b & m);
        }
    }

    /// Lane-wise equality as a mask. Whole-word XNOR; no cross-lane leakage.
    pub fn eq_mask(&self, other: &LaneMask) -> LaneMask {
        let mut out = self.ne_mask(other);
        out.negate();
        out
    }

    /// Lane-wise inequality as a mask. Whole-word XOR.
    pub fn ne_mask(&self, other: &LaneMask) -> LaneMask {
        check_lanes("LaneMask::ne_mask", self.lanes, other.lanes);
        let words = self.words.iter().zip(other.words.iter()).map(|(&a, &b)| a ^ b);
        LaneMask::from_words(self.lanes, words)
    }

    /// `self & other` as a new mask.
    pub fn and(&self, other: &LaneMask) -> LaneMask {
        let mut out = self.clone();
        out.and_assign(other);
        out
    }

    /// `self | other` as a new mask.
    pub fn or(&self, other: &LaneMask) -> LaneMask {
        let mut out = self.clone();
        out.or_assign(other);
        out
    }
}

impl fmt::Debug for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LaneMask[")?;
        for lane in 0..self.lanes {
            write!(f, "{}", if self.test_bit(lane) { '1' } else { '0' })?;
        }
        write!(f, "]")
    }
}

// ============================================================================
// Tests
// ============================================================================
