//! Greedy graph coloring, one independent coloring per lane.
//!
//! Colors are one-hot `u64` words (bit c = color c); 0 means uncolored. A
//! vertex ORs together the colors of its lower-id neighbors and takes the
//! lowest bit not in that set. Reading only lower ids makes the fixed point
//! the sequential greedy coloring in id order, so two adjacent vertices that
//! recompute in the same superstep cannot chase each other forever.
//!
//! A lane runs out of colors when all 64 are taken by lower-id neighbors;
//! `apply` then returns [`Error::ColorCapacityExhausted`].

use std::marker::PhantomData;

use crate::lane::{LaneMask, LaneVector};
use crate::message::{Combiner, Message};
use crate::model::{EdgeDir, VertexId};
use crate::{Error, Result};
use super::{Algorithm, EdgeContext, VertexProgram};

/// Index of a one-hot color word, or `None` for uncolored.
pub fn color_index(color: u64) -> Option<u32> {
    (color != 0).then(|| color.trailing_zeros())
}

#[derive(Debug, Clone)]
pub struct GreedyColoring<E = ()> {
    lanes: usize,
    _marker: PhantomData<fn(&E)>,
}

impl<E> GreedyColoring<E> {
    pub fn new(lanes: usize) -> Self {
        Self { lanes, _marker: PhantomData }
    }
}

impl<E: Send + Sync> VertexProgram for GreedyColoring<E> {
    type State = LaneVector<u64>;
    type EdgeData = E;
    type Delta = LaneVector<u64>;

    const ALGORITHM: Algorithm = Algorithm::GreedyColoring;

    fn lanes(&self) -> usize {
        self.lanes
    }

    fn combiner(&self) -> Combiner {
        Combiner::Or
    }

    // Coloring constrains both endpoints of an edge regardless of direction.
    fn gather_edges(&self, _directed: bool) -> EdgeDir {
        EdgeDir::All
    }

    fn scatter_edges(&self, _directed: bool) -> EdgeDir {
        EdgeDir::All
    }

    fn initial_state(&self, _vertex: VertexId) -> LaneVector<u64> {
        LaneVector::new(self.lanes)
    }

    fn empty_delta(&self) -> LaneVector<u64> {
        LaneVector::new(self.lanes)
    }

    fn source_message(&self, lane: usize) -> Message<LaneVector<u64>> {
        Message::tracked(self.empty_delta(), LaneMask::single(self.lanes, lane))
    }

    fn gather(&self, ctx: &EdgeContext<'_, LaneVector<u64>, E>) -> Option<Message<LaneVector<u64>>> {
        (ctx.other < ctx.vertex).then(|| Message::new(ctx.other_state.clone()))
    }

    fn apply(
        &self,
        vertex: VertexId,
        state: &mut LaneVector<u64>,
        acc: &Message<LaneVector<u64>>,
    ) -> Result<LaneMask> {
        let effective = acc.effective_lanes();
        if let Some(lane) = effective.iter_set().find(|&l| acc.delta.get_single(l) == u64::MAX) {
            return Err(Error::ColorCapacityExhausted { vertex, lane });
        }
        let candidate = acc.delta.lowest_unset_bit();
        let changed = state.ne_mask(&candidate, Some(&effective));
        state.set_masked(&candidate, &changed);
        Ok(changed)
    }

    fn scatter(
        &self,
        _ctx: &EdgeContext<'_, LaneVector<u64>, E>,
        send: &LaneMask,
    ) -> Option<Message<LaneVector<u64>>> {
        Some(Message::tracked(self.empty_delta(), send.clone()))
    }
}
