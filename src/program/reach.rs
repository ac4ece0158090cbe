//! Multi-source reachability: one "reached" bit per query lane.

use std::marker::PhantomData;

use crate::lane::LaneMask;
use crate::message::{Combiner, Message};
use crate::model::{EdgeDir, VertexId};
use crate::Result;
use super::{Algorithm, EdgeContext, VertexProgram};

/// BFS reachability over edges carrying any data `E`.
#[derive(Debug, Clone)]
pub struct Reachability<E = ()> {
    lanes: usize,
    _marker: PhantomData<fn(&E)>,
}

impl<E> Reachability<E> {
    pub fn new(lanes: usize) -> Self {
        Self { lanes, _marker: PhantomData }
    }
}

impl<E: Send + Sync> VertexProgram for Reachability<E> {
    type State = LaneMask;
    type EdgeData = E;
    type Delta = LaneMask;

    const ALGORITHM: Algorithm = Algorithm::Reachability;

    fn lanes(&self) -> usize {
        self.lanes
    }

    fn combiner(&self) -> Combiner {
        Combiner::Or
    }

    fn gather_edges(&self, directed: bool) -> EdgeDir {
        if directed { EdgeDir::In } else { EdgeDir::All }
    }

    fn scatter_edges(&self, directed: bool) -> EdgeDir {
        if directed { EdgeDir::Out } else { EdgeDir::All }
    }

    fn initial_state(&self, _vertex: VertexId) -> LaneMask {
        LaneMask::new(self.lanes)
    }

    fn empty_delta(&self) -> LaneMask {
        LaneMask::new(self.lanes)
    }

    fn source_message(&self, lane: usize) -> Message<LaneMask> {
        let bit = LaneMask::single(self.lanes, lane);
        Message::tracked(bit.clone(), bit)
    }

    fn gather(&self, ctx: &EdgeContext<'_, LaneMask, E>) -> Option<Message<LaneMask>> {
        if ctx.other_state.all_zero() {
            return None;
        }
        Some(Message::new(ctx.other_state.clone()))
    }

    fn apply(&self, _vertex: VertexId, state: &mut LaneMask, acc: &Message<LaneMask>) -> Result<LaneMask> {
        let mut fresh = acc.delta.clone();
        fresh.and_not_assign(state);
        if let Some(track) = &acc.track {
            fresh.and_assign(track);
        }
        state.or_assign(&fresh);
        Ok(fresh)
    }

    fn scatter(&self, ctx: &EdgeContext<'_, LaneMask, E>, send: &LaneMask) -> Option<Message<LaneMask>> {
        Some(Message::tracked(ctx.state.and(send), send.clone()))
    }
}
