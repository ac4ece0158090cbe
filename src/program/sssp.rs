//! Multi-source shortest distance (and hop-count BFS).
//!
//! Lane i holds the distance from query i's source. Unreached lanes hold
//! `T::INFINITY`; edge weights are added with sentinel clamping so an
//! infinite lane never wraps back into range.

use std::marker::PhantomData;

use crate::lane::{LaneMask, LaneScalar, LaneVector};
use crate::message::{Combiner, Message};
use crate::model::{EdgeDir, VertexId};
use crate::Result;
use super::{Algorithm, EdgeContext, VertexProgram};

/// Edge data that yields a distance increment.
pub trait EdgeWeight<T> {
    fn weight(&self) -> T;
}

macro_rules! impl_edge_weight {
    ($($t:ty),*) => {
        $(impl EdgeWeight<$t> for $t {
            #[inline]
            fn weight(&self) -> $t {
                *self
            }
        })*
    };
}

impl_edge_weight!(i32, i64, u32, u64, f32, f64);

/// Unweighted edges count one hop each.
impl<T: LaneScalar> EdgeWeight<T> for () {
    #[inline]
    fn weight(&self) -> T {
        T::ONE
    }
}

/// Shortest-distance program over edge data `E`.
#[derive(Debug, Clone)]
pub struct ShortestPath<T, E = T> {
    lanes: usize,
    _marker: PhantomData<fn(&E) -> T>,
}

impl<T: LaneScalar, E: EdgeWeight<T>> ShortestPath<T, E> {
    pub fn new(lanes: usize) -> Self {
        Self { lanes, _marker: PhantomData }
    }
}

impl<T: LaneScalar> ShortestPath<T, ()> {
    /// Hop-count BFS: every edge weighs one.
    pub fn unweighted(lanes: usize) -> Self {
        Self::new(lanes)
    }
}

impl<T, E> VertexProgram for ShortestPath<T, E>
where
    T: LaneScalar,
    E: EdgeWeight<T> + Send + Sync,
{
    type State = LaneVector<T>;
    type EdgeData = E;
    type Delta = LaneVector<T>;

    const ALGORITHM: Algorithm = Algorithm::ShortestPath;

    fn lanes(&self) -> usize {
        self.lanes
    }

    fn combiner(&self) -> Combiner {
        Combiner::Min
    }

    fn gather_edges(&self, directed: bool) -> EdgeDir {
        if directed { EdgeDir::In } else { EdgeDir::All }
    }

    fn scatter_edges(&self, directed: bool) -> EdgeDir {
        if directed { EdgeDir::Out } else { EdgeDir::All }
    }

    fn initial_state(&self, _vertex: VertexId) -> LaneVector<T> {
        LaneVector::filled(self.lanes, T::INFINITY)
    }

    fn empty_delta(&self) -> LaneVector<T> {
        LaneVector::filled(self.lanes, T::INFINITY)
    }

    fn source_message(&self, lane: usize) -> Message<LaneVector<T>> {
        let mut delta = self.empty_delta();
        delta.set_single(T::ZERO, lane);
        Message::tracked(delta, LaneMask::single(self.lanes, lane))
    }

    fn gather(&self, ctx: &EdgeContext<'_, LaneVector<T>, E>) -> Option<Message<LaneVector<T>>> {
        let mut candidate = ctx.other_state.clone();
        candidate.add_scalar(ctx.edge.weight());
        Some(Message::new(candidate))
    }

    fn apply(
        &self,
        _vertex: VertexId,
        state: &mut LaneVector<T>,
        acc: &Message<LaneVector<T>>,
    ) -> Result<LaneMask> {
        let improved = state.gt_mask(&acc.delta, acc.track.as_ref());
        state.set_masked(&acc.delta, &improved);
        Ok(improved)
    }

    fn scatter(
        &self,
        ctx: &EdgeContext<'_, LaneVector<T>, E>,
        send: &LaneMask,
    ) -> Option<Message<LaneVector<T>>> {
        let mut delta = self.empty_delta();
        delta.set_masked(ctx.state, send);
        delta.add_scalar_masked(ctx.edge.weight(), send);
        Some(Message::tracked(delta, send.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        state: &'a LaneVector<i32>,
        other_state: &'a LaneVector<i32>,
        edge: &'a i32,
    ) -> EdgeContext<'a, LaneVector<i32>, i32> {
        EdgeContext { vertex: VertexId(1), state, other: VertexId(2), other_state, edge }
    }

    #[test]
    fn gather_adds_weight_and_keeps_infinity() {
        let p = ShortestPath::<i32>::new(3);
        let me = p.initial_state(VertexId(1));
        let other = LaneVector::from_vec(vec![0, 4, i32::INFINITY]);
        let msg = p.gather(&ctx(&me, &other, &2)).unwrap();
        assert_eq!(msg.delta.as_slice(), &[2, 6, i32::INFINITY]);
    }

    #[test]
    fn apply_only_takes_strict_improvements() {
        let p = ShortestPath::<i32>::new(3);
        let mut state = LaneVector::from_vec(vec![5, 5, 5]);
        let acc = Message::new(LaneVector::from_vec(vec![4, 5, 6]));
        let changed = p.apply(VertexId(1), &mut state, &acc).unwrap();
        assert_eq!(changed.iter_set().collect::<Vec<_>>(), vec![0]);
        assert_eq!(state.as_slice(), &[4, 5, 5]);
    }

    #[test]
    fn apply_ignores_untracked_lanes() {
        let p = ShortestPath::<i32>::new(2);
        let mut state = p.initial_state(VertexId(1));
        let mut acc = Message::new(LaneVector::from_vec(vec![1, 1]));
        acc.restrict(&LaneMask::single(2, 1), Combiner::Min);
        let changed = p.apply(VertexId(1), &mut state, &acc).unwrap();
        assert_eq!(changed.iter_set().collect::<Vec<_>>(), vec![1]);
        assert_eq!(state.get_single(0), i32::INFINITY);
    }

    #[test]
    fn scatter_sends_only_the_send_lanes() {
        let p = ShortestPath::<i32>::new(4);
        let me = LaneVector::from_vec(vec![0, 1, 2, 3]);
        let other = p.initial_state(VertexId(2));
        let send = LaneMask::single(4, 2);
        let msg = p.scatter(&ctx(&me, &other, &10), &send).unwrap();
        assert_eq!(msg.track.as_ref().map(LaneMask::count_set), Some(1));
        assert_eq!(msg.delta.as_slice(), &[i32::INFINITY, i32::INFINITY, 12, i32::INFINITY]);
    }

    #[test]
    fn unweighted_edges_weigh_one_hop() {
        let p = ShortestPath::<u32, ()>::unweighted(1);
        let me = p.initial_state(VertexId(1));
        let other = LaneVector::from_vec(vec![7u32]);
        let c = EdgeContext { vertex: VertexId(1), state: &me, other: VertexId(2), other_state: &other, edge: &() };
        assert_eq!(p.gather(&c).unwrap().delta.get_single(0), 8);
    }
}
