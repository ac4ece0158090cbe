//! Wire format for lane containers.
//!
//! ```text
//! LaneVector            [u64 LE capacity][capacity × lane, LE]
//! LaneVector (masked)   [u64 LE capacity][count_set(mask) × lane, LE]
//! LaneMask              [u64 LE capacity][ceil(capacity / 8) bytes]
//! ```
//!
//! Mask bytes are packed little-endian: bit i of byte i/8 is lane i. A masked
//! vector carries no positions; the reader must hold the same mask.
//!
//! Decoders treat their input as foreign and return [`Error::Codec`] or
//! [`Error::LaneCountMismatch`] instead of panicking.

use bytes::{Buf, BufMut};

use super::{LaneMask, LaneScalar, LaneVector};
use crate::{Error, Result};

fn get_capacity<B: Buf>(src: &mut B, what: &str) -> Result<usize> {
    if src.remaining() < 8 {
        return Err(Error::Codec(format!("{what}: truncated capacity header")));
    }
    usize::try_from(src.get_u64_le())
        .map_err(|_| Error::Codec(format!("{what}: capacity does not fit in usize")))
}

fn ensure_remaining<B: Buf>(src: &B, need: usize, what: &str) -> Result<()> {
    if src.remaining() < need {
        return Err(Error::Codec(format!(
            "{what}: need {need} bytes, {} remaining",
            src.remaining()
        )));
    }
    Ok(())
}

impl<T: LaneScalar> LaneVector<T> {
    /// Append `[capacity][all lanes]` to `out`.
    pub fn save<B: BufMut>(&self, out: &mut B) {
        out.put_u64_le(self.lanes() as u64);
        for &v in self.iter() {
            v.put_le(out);
        }
    }

    /// Read a vector written by [`LaneVector::save`].
    pub fn load<B: Buf>(src: &mut B) -> Result<Self> {
        let lanes = get_capacity(src, "LaneVector::load")?;
        let need = lanes
            .checked_mul(T::BYTES)
            .ok_or_else(|| Error::Codec("LaneVector::load: capacity overflow".into()))?;
        ensure_remaining(src, need, "LaneVector::load")?;
        Ok(Self::from_vec((0..lanes).map(|_| T::get_le(src)).collect()))
    }

    /// Append `[capacity][lanes selected by mask]` to `out`.
    ///
    /// # Panics
    ///
    /// Panics if `mask` does not have this vector's lane count.
    pub fn masked_save<B: BufMut>(&self, mask: &LaneMask, out: &mut B) {
        super::check_lanes("LaneVector::masked_save", self.lanes(), mask.lanes());
        out.put_u64_le(self.lanes() as u64);
        for lane in mask.iter_set() {
            self.get_single(lane).put_le(out);
        }
    }

    /// Read a vector written by [`LaneVector::masked_save`] with the same
    /// `mask`. Lanes outside the mask are set to `fill`.
    pub fn masked_load<B: Buf>(src: &mut B, mask: &LaneMask, fill: T) -> Result<Self> {
        let lanes = get_capacity(src, "LaneVector::masked_load")?;
        if lanes != mask.lanes() {
            return Err(Error::LaneCountMismatch { expected: mask.lanes(), got: lanes });
        }
        ensure_remaining(src, mask.count_set() * T::BYTES, "LaneVector::masked_load")?;
        let mut v = Self::filled(lanes, fill);
        for lane in mask.iter_set() {
            v.set_single(T::get_le(src), lane);
        }
        Ok(v)
    }
}

impl LaneMask {
    /// Append `[capacity][packed bytes]` to `out`.
    pub fn save<B: BufMut>(&self, out: &mut B) {
        out.put_u64_le(self.lanes() as u64);
        let nbytes = self.lanes().div_ceil(8);
        let bytes = self.words().iter().flat_map(|w| w.to_le_bytes());
        for b in bytes.take(nbytes) {
            out.put_u8(b);
        }
    }

    /// Read a mask written by [`LaneMask::save`]. Bits past the capacity are
    /// discarded.
    pub fn load<B: Buf>(src: &mut B) -> Result<Self> {
        let lanes = get_capacity(src, "LaneMask::load")?;
        // checked before any word buffer is sized from the header
        let nbytes = lanes.div_ceil(8);
        ensure_remaining(src, nbytes, "LaneMask::load")?;
        let mut raw = vec![0u8; nbytes];
        src.copy_to_slice(&mut raw);
        let words = raw.chunks(8).map(|chunk| {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            u64::from_le_bytes(word)
        });
        Ok(LaneMask::from_words(lanes, words))
    }
}

// ============================================================================
// Tests
// ============================================================================
