//! # Vertex Programs
//!
//! Gather/apply/scatter over lane-packed state. One program instance drives
//! all K lanes of a run; the engine calls it per vertex per superstep:
//!
//! ```text
//! IDLE ──signal──▶ GATHER ──merge──▶ APPLY ──changed mask──▶ SCATTER ──▶ IDLE | HALTED
//! ```
//!
//! | Program | State | Combiner | Improves when |
//! |---------|-------|----------|---------------|
//! | [`ShortestPath`] | `LaneVector<T>` distance | min | candidate strictly smaller |
//! | [`Reachability`] | `LaneMask` reached | or | bit newly set |
//! | [`GreedyColoring`] | `LaneVector<u64>` one-hot color | or | smallest free color differs |
//! | [`LatentFactors`] | `LatentState` | sum | lane is tracked (always) |
//!
//! Programs are generic and dispatched statically; the engine is
//! monomorphized per program, so there is no per-call virtual dispatch in
//! the superstep loop.

pub mod sssp;
pub mod reach;
pub mod coloring;
pub mod latent;

use std::fmt::{self, Debug};
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::lane::LaneMask;
use crate::message::{Combinable, Combiner, Message};
use crate::model::{EdgeDir, VertexId};
use crate::{Error, Result};

pub use sssp::{EdgeWeight, ShortestPath};
pub use reach::Reachability;
pub use coloring::GreedyColoring;
pub use latent::{LatentBlock, LatentFactors, LatentParams, LatentState};

/// Read-only view of one edge during gather or scatter.
#[derive(Debug)]
pub struct EdgeContext<'a, S, E> {
    /// The vertex running the program.
    pub vertex: VertexId,
    pub state: &'a S,
    /// The far endpoint of the edge.
    pub other: VertexId,
    pub other_state: &'a S,
    pub edge: &'a E,
}

/// The gather/apply/scatter contract.
///
/// `gather` and `scatter` are pure. `apply` writes only the vertex's own
/// state and reports the lanes it changed. A program must never send a
/// message for a vertex whose changed mask is all-zero; the engine enforces
/// this by not calling `scatter` at all in that case.
pub trait VertexProgram: Sync {
    type State: Clone + Debug + Send + Sync;
    type EdgeData: Send + Sync;
    type Delta: Combinable;

    const ALGORITHM: Algorithm;

    /// Lane count K of every container this program produces.
    fn lanes(&self) -> usize;

    fn combiner(&self) -> Combiner;

    fn gather_edges(&self, directed: bool) -> EdgeDir;

    fn scatter_edges(&self, directed: bool) -> EdgeDir;

    fn initial_state(&self, vertex: VertexId) -> Self::State;

    /// Delta with the combiner identity in every lane.
    fn empty_delta(&self) -> Self::Delta;

    /// Seed message activating query `lane` at its source vertex.
    fn source_message(&self, lane: usize) -> Message<Self::Delta>;

    /// Contribution of one edge, or `None` if the edge contributes nothing.
    fn gather(&self, ctx: &EdgeContext<'_, Self::State, Self::EdgeData>) -> Option<Message<Self::Delta>>;

    /// Fold the merged message into `state`; return the changed lanes.
    fn apply(&self, vertex: VertexId, state: &mut Self::State, acc: &Message<Self::Delta>) -> Result<LaneMask>;

    /// Message for the far endpoint carrying the lanes in `send`, or `None`
    /// to leave that neighbor alone.
    fn scatter(
        &self,
        ctx: &EdgeContext<'_, Self::State, Self::EdgeData>,
        send: &LaneMask,
    ) -> Option<Message<Self::Delta>>;
}

/// The closed set of algorithm variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    ShortestPath,
    Reachability,
    GreedyColoring,
    LatentFactors,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::ShortestPath => "sssp",
            Algorithm::Reachability => "reach",
            Algorithm::GreedyColoring => "coloring",
            Algorithm::LatentFactors => "sgd",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sssp" | "shortest_path" => Ok(Algorithm::ShortestPath),
            "bfs" | "reach" | "reachability" => Ok(Algorithm::Reachability),
            "coloring" | "greedy_coloring" => Ok(Algorithm::GreedyColoring),
            "sgd" | "latent" | "latent_factors" => Ok(Algorithm::LatentFactors),
            other => Err(Error::Config(format!("unknown algorithm '{other}'"))),
        }
    }
}
