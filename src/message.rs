//! Messages and combiners.
//!
//! A [`Message`] is a per-lane delta plus an optional *track* mask naming the
//! lanes it concerns. Messages bound for the same vertex in the same superstep
//! are merged with the program's [`Combiner`], in whatever order they arrive.
//!
//! ## Merge rules
//!
//! | old \ incoming | untracked | tracked `t` |
//! |---|---|---|
//! | untracked | combine all lanes | combine lanes in `t` |
//! | tracked `s` | combine all lanes, result untracked | combine `s ∩ t`, copy `t \ s`, track `s ∪ t` |
//!
//! Lanes of a tracked delta outside its track are never read: `merge`
//! resets its own outside lanes to the combiner identity before combining,
//! and only reads `incoming` inside `t`. [`Message::untrack`] does the same
//! before dropping a track, so whatever a producer left outside its track
//! never becomes a real lane value.
//!
//! `Min`, `Max` and `Or` are idempotent under duplicate delivery. `Sum` is
//! not: a sum-combined run requires each message to be delivered exactly once.

use std::fmt::{self, Debug};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::lane::{check_lanes, LaneMask, LaneScalar, LaneVector};
use crate::{Error, Result};

/// Lane-wise merge operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combiner {
    Min,
    Max,
    /// Bitwise OR (flags, color sets).
    Or,
    /// Additive accumulation. Exactly-once delivery required.
    Sum,
}

impl Combiner {
    /// The value `x` with `combine(x, y) == y` for all `y`.
    pub fn identity<T: LaneScalar>(self) -> T {
        match self {
            Combiner::Min => T::INFINITY,
            Combiner::Max => T::NEG_INFINITY,
            Combiner::Or | Combiner::Sum => T::ZERO,
        }
    }

    #[inline]
    pub fn apply<T: LaneScalar>(self, a: T, b: T) -> T {
        match self {
            Combiner::Min => a.lane_min(b),
            Combiner::Max => a.lane_max(b),
            Combiner::Or => a.bit_or(b),
            Combiner::Sum => a.clamped_add(b),
        }
    }

    /// Safe under duplicate delivery.
    pub fn is_idempotent(self) -> bool {
        !matches!(self, Combiner::Sum)
    }
}

impl fmt::Display for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Combiner::Min => "min",
            Combiner::Max => "max",
            Combiner::Or => "or",
            Combiner::Sum => "sum",
        };
        f.write_str(name)
    }
}

/// A lane-packed payload that can be merged, masked and put on the wire.
pub trait Combinable: Clone + Debug + Send + Sync {
    fn lanes(&self) -> usize;

    /// Merge `other` into `self` with `op`, on all lanes or only `within`.
    fn combine(&mut self, other: &Self, op: Combiner, within: Option<&LaneMask>);

    /// Copy `other`'s lanes into `self` where `within` is set.
    fn assign(&mut self, other: &Self, within: &LaneMask);

    /// Reset the lanes in `within` to `op`'s identity.
    fn reset(&mut self, op: Combiner, within: &LaneMask);

    /// Encode all lanes, or only the lanes of `track` when given.
    fn encode<B: BufMut>(&self, track: Option<&LaneMask>, out: &mut B);

    /// Inverse of [`Combinable::encode`]. Untransmitted lanes come back as
    /// `op`'s identity.
    fn decode<B: Buf>(src: &mut B, track: Option<&LaneMask>, op: Combiner) -> Result<Self>;
}

impl<T: LaneScalar> Combinable for LaneVector<T> {
    fn lanes(&self) -> usize {
        LaneVector::lanes(self)
    }

    fn combine(&mut self, other: &Self, op: Combiner, within: Option<&LaneMask>) {
        match (op, within) {
            (Combiner::Min, None) => self.min_with(other),
            (Combiner::Min, Some(m)) => self.min_with_masked(other, m),
            (Combiner::Max, None) => self.max_with(other),
            (Combiner::Max, Some(m)) => self.max_with_masked(other, m),
            (Combiner::Or, None) => self.or_with(other),
            (Combiner::Or, Some(m)) => self.or_with_masked(other, m),
            (Combiner::Sum, None) => self.add_with(other),
            (Combiner::Sum, Some(m)) => self.add_with_masked(other, m),
        }
    }

    fn assign(&mut self, other: &Self, within: &LaneMask) {
        self.set_masked(other, within);
    }

    fn reset(&mut self, op: Combiner, within: &LaneMask) {
        self.fill_masked(op.identity(), within);
    }

    fn encode<B: BufMut>(&self, track: Option<&LaneMask>, out: &mut B) {
        match track {
            Some(mask) => self.masked_save(mask, out),
            None => self.save(out),
        }
    }

    fn decode<B: Buf>(src: &mut B, track: Option<&LaneMask>, op: Combiner) -> Result<Self> {
        match track {
            Some(mask) => LaneVector::masked_load(src, mask, op.identity()),
            None => LaneVector::load(src),
        }
    }
}

/// Masks combine as booleans: `Min` is AND, every other operator is OR.
impl Combinable for LaneMask {
    fn lanes(&self) -> usize {
        LaneMask::lanes(self)
    }

    fn combine(&mut self, other: &Self, op: Combiner, within: Option<&LaneMask>) {
        let mut merged = self.clone();
        match op {
            Combiner::Min => merged.and_assign(other),
            Combiner::Max | Combiner::Or | Combiner::Sum => merged.or_assign(other),
        }
        match within {
            Some(m) => self.set_from(&merged, m),
            None => *self = merged,
        }
    }

    fn assign(&mut self, other: &Self, within: &LaneMask) {
        self.set_from(other, within);
    }

    fn reset(&mut self, op: Combiner, within: &LaneMask) {
        match op {
            Combiner::Min => self.or_assign(within),
            _ => self.and_not_assign(within),
        }
    }

    fn encode<B: BufMut>(&self, _track: Option<&LaneMask>, out: &mut B) {
        self.save(out);
    }

    fn decode<B: Buf>(src: &mut B, track: Option<&LaneMask>, op: Combiner) -> Result<Self> {
        let mut mask = LaneMask::load(src)?;
        if let Some(track) = track {
            if track.lanes() != mask.lanes() {
                return Err(Error::LaneCountMismatch { expected: track.lanes(), got: mask.lanes() });
            }
            let mut outside = track.clone();
            outside.negate();
            mask.reset(op, &outside);
        }
        Ok(mask)
    }
}

// ============================================================================
// Message
// ============================================================================

/// Delta plus optional track mask.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<P> {
    pub delta: P,
    pub track: Option<LaneMask>,
}

impl<P: Combinable> Message<P> {
    /// Untracked message: every lane is meaningful.
    pub fn new(delta: P) -> Self {
        Self { delta, track: None }
    }

    /// Tracked message.
    ///
    /// # Panics
    ///
    /// Panics if `track` is narrower or wider than `delta`.
    #[track_caller]
    pub fn tracked(delta: P, track: LaneMask) -> Self {
        check_lanes("Message::tracked", delta.lanes(), track.lanes());
        Self { delta, track: Some(track) }
    }

    pub fn lanes(&self) -> usize {
        self.delta.lanes()
    }

    pub fn is_tracked(&self) -> bool {
        self.track.is_some()
    }

    /// Lanes this message concerns: its track, or every lane.
    pub fn effective_lanes(&self) -> LaneMask {
        match &self.track {
            Some(t) => t.clone(),
            None => LaneMask::full(self.lanes()),
        }
    }

    /// Narrow the message to `focus`; lanes leaving the track are reset to
    /// `op`'s identity.
    pub fn restrict(&mut self, focus: &LaneMask, op: Combiner) {
        let mut track = self.effective_lanes();
        track.and_assign(focus);
        let mut outside = track.clone();
        outside.negate();
        self.delta.reset(op, &outside);
        self.track = Some(track);
    }

    /// Reset every lane outside the track to `op`'s identity. No-op on an
    /// untracked message.
    pub fn normalize(&mut self, op: Combiner) {
        if let Some(track) = &self.track {
            let mut outside = track.clone();
            outside.negate();
            self.delta.reset(op, &outside);
        }
    }

    /// Drop the track mask, making every lane meaningful. Lanes that were
    /// outside the track become `op`'s identity first.
    pub fn untrack(&mut self, op: Combiner) {
        self.normalize(op);
        self.track = None;
    }

    /// Merge `incoming` into `self`. See the module docs for the rules.
    ///
    /// # Panics
    ///
    /// Panics if the two messages have different lane counts.
    #[track_caller]
    pub fn merge(&mut self, incoming: &Message<P>, op: Combiner) {
        check_lanes("Message::merge", self.lanes(), incoming.lanes());
        self.normalize(op);
        let Some(t) = &incoming.track else {
            self.delta.combine(&incoming.delta, op, None);
            self.track = None;
            return;
        };
        match &mut self.track {
            None => {
                self.delta.combine(&incoming.delta, op, Some(t));
            }
            Some(s) => {
                let both = s.and(t);
                let mut only_new = t.clone();
                only_new.and_not_assign(s);
                self.delta.combine(&incoming.delta, op, Some(&both));
                self.delta.assign(&incoming.delta, &only_new);
                s.or_assign(t);
            }
        }
    }

    /// `[1u8][track][delta masked by track]` or `[0u8][delta]`.
    pub fn encode<B: BufMut>(&self, out: &mut B) {
        match &self.track {
            Some(track) => {
                out.put_u8(1);
                track.save(out);
                self.delta.encode(Some(track), out);
            }
            None => {
                out.put_u8(0);
                self.delta.encode(None, out);
            }
        }
    }

    pub fn decode<B: Buf>(src: &mut B, op: Combiner) -> Result<Self> {
        if !src.has_remaining() {
            return Err(Error::Codec("Message::decode: empty input".into()));
        }
        match src.get_u8() {
            0 => Ok(Self::new(P::decode(src, None, op)?)),
            1 => {
                let track = LaneMask::load(src)?;
                let delta = P::decode(src, Some(&track), op)?;
                if delta.lanes() != track.lanes() {
                    return Err(Error::LaneCountMismatch { expected: track.lanes(), got: delta.lanes() });
                }
                Ok(Self { delta, track: Some(track) })
            }
            tag => Err(Error::Codec(format!("Message::decode: unknown tag {tag}"))),
        }
    }
}

impl<P: Debug> Debug for Message<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.track {
            Some(t) => write!(f, "Message({:?} @ {:?})", self.delta, t),
            None => write!(f, "Message({:?})", self.delta),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tracked(values: Vec<i32>, lanes: &[usize]) -> Message<LaneVector<i32>> {
        let track = LaneMask::from_lanes(values.len(), lanes.iter().copied());
        let mut msg = Message::tracked(LaneVector::from_vec(values), track.clone());
        msg.restrict(&track, Combiner::Min);
        msg
    }

    #[test]
    fn tracked_merge_touches_only_incoming_lanes() {
        let mut old = tracked(vec![5, 5, 5, 5], &[0, 1]);
        let incoming = tracked(vec![1, 9, 2, 9], &[0, 2]);
        old.merge(&incoming, Combiner::Min);

        assert_eq!(old.delta.as_slice(), &[1, 5, 2, i32::INFINITY]);
        assert_eq!(old.track.unwrap().iter_set().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn untracked_incoming_absorbs_track() {
        let mut old = tracked(vec![5, 5], &[0]);
        let incoming = Message::new(LaneVector::from_vec(vec![7, 3]));
        old.merge(&incoming, Combiner::Min);
        assert_eq!(old.delta.as_slice(), &[5, 3]);
        assert!(!old.is_tracked());
    }

    #[test]
    fn lanes_outside_track_do_not_leak_into_sum() {
        let junk = Message::tracked(LaneVector::from_vec(vec![1, 9]), LaneMask::single(2, 0));
        let full = Message::new(LaneVector::from_vec(vec![5, 5]));

        let mut a = junk.clone();
        a.merge(&full, Combiner::Sum);
        let mut b = full.clone();
        b.merge(&junk, Combiner::Sum);

        assert_eq!(a.delta.as_slice(), &[6, 5]);
        assert_eq!(a, b);
    }

    #[test]
    fn untrack_resets_lanes_outside_track() {
        let mut m = Message::tracked(LaneVector::from_vec(vec![0u32, 0, 7]), LaneMask::from_lanes(3, [0, 2]));
        m.untrack(Combiner::Min);
        assert!(!m.is_tracked());
        assert_eq!(m.delta.as_slice(), &[0, u32::INFINITY, 7]);
    }

    #[test]
    fn min_merge_is_idempotent() {
        let mut once = tracked(vec![4, 8, 1], &[0, 1, 2]);
        let m = tracked(vec![6, 2, 1], &[1, 2]);
        once.merge(&m, Combiner::Min);
        let mut twice = once.clone();
        twice.merge(&m, Combiner::Min);
        assert_eq!(once, twice);
    }

    #[test]
    fn sum_merge_is_not_idempotent() {
        assert!(!Combiner::Sum.is_idempotent());
        let mut acc = Message::new(LaneVector::from_vec(vec![1.0f64, 1.0]));
        let m = Message::new(LaneVector::from_vec(vec![0.5f64, 0.5]));
        acc.merge(&m, Combiner::Sum);
        acc.merge(&m, Combiner::Sum);
        assert_eq!(acc.delta.as_slice(), &[2.0, 2.0]);
    }

    #[test]
    fn restrict_resets_lanes_to_identity() {
        let mut m = Message::new(LaneVector::from_vec(vec![3u32, 4, 5]));
        m.restrict(&LaneMask::single(3, 1), Combiner::Min);
        assert_eq!(m.delta.as_slice(), &[u32::INFINITY, 4, u32::INFINITY]);
        assert_eq!(m.track.as_ref().map(LaneMask::count_set), Some(1));
    }

    #[test]
    fn mask_payload_or_merge() {
        let mut old = Message::tracked(LaneMask::from_lanes(4, [0]), LaneMask::from_lanes(4, [0, 1]));
        let incoming = Message::tracked(LaneMask::from_lanes(4, [2]), LaneMask::from_lanes(4, [2]));
        old.merge(&incoming, Combiner::Or);
        assert_eq!(old.delta.iter_set().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn wire_round_trip_keeps_tracked_lanes() {
        let msg = tracked(vec![10, 20, 30, 40], &[1, 3]);
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        // tag + mask(8 + 1) + vector(8 + 2 lanes)
        assert_eq!(buf.len(), 1 + 9 + 8 + 2 * 4);
        let back = Message::<LaneVector<i32>>::decode(&mut &buf[..], Combiner::Min).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let err = Message::<LaneVector<i32>>::decode(&mut &[7u8][..], Combiner::Min).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    #[should_panic(expected = "Message::tracked")]
    fn track_width_must_match_delta() {
        Message::tracked(LaneVector::<i32>::new(4), LaneMask::new(2));
    }
}
