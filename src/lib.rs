//! # lanegraph — Multi-Query Vertex-Centric Graph Engine
//!
//! Runs K independent instances of the same graph algorithm (K BFS sources,
//! K SSSP sources, K colorings, K latent-factor models) inside one
//! bulk-synchronous traversal. Every vertex carries a fixed-width vector of
//! per-query scalars, and every gather/apply/scatter step works on all K
//! lanes at once, with masks selecting which lanes are active, changed, or
//! worth sending.
//!
//! ## Design Principles
//!
//! 1. **Lane-aligned containers**: bit i of a `LaneMask` is element i of every
//!    `LaneVector` used with it; mismatched widths panic
//! 2. **Order-free merging**: combiners are associative and commutative, so
//!    delivery order never changes a result
//! 3. **No change, no message**: a vertex with an all-zero changed mask sends
//!    nothing, which is what makes quiescence detectable
//! 4. **Explicit configuration**: lane count and caps travel in `EngineConfig`
//!
//! ## Quick Start
//!
//! ```rust
//! use lanegraph::{Edge, Engine, EngineConfig, MemoryGraph, QuerySet, ShortestPath, VertexId};
//!
//! # fn example() -> lanegraph::Result<()> {
//! let graph = MemoryGraph::from_edges([
//!     Edge::new(1, 2, 1i32),
//!     Edge::new(2, 3, 2),
//!     Edge::new(1, 3, 5),
//! ]);
//!
//! let mut engine = Engine::new(&graph, ShortestPath::<i32>::new(2), EngineConfig::with_lanes(2))?;
//! engine.seed_queries(&QuerySet::from_sources([1u64, 2]))?;
//! let stats = engine.run()?;
//!
//! let d = engine.state_of(VertexId(3)).unwrap();
//! assert_eq!((d.get_single(0), d.get_single(1)), (3, 2));
//! assert!(stats.converged());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Programs
//!
//! | Program | Combiner | Feature |
//! |---------|----------|---------|
//! | `ShortestPath` | min | weighted SSSP, hop-count BFS via `unweighted` |
//! | `Reachability` | or | reached-set BFS |
//! | `GreedyColoring` | or | greedy coloring, lower-id priority |
//! | `LatentFactors` | sum | SGD matrix factorization |
//!
//! The `parallel` feature runs each superstep phase on rayon.

// ============================================================================
// Modules
// ============================================================================

pub mod lane;
pub mod message;
pub mod model;
pub mod storage;
pub mod program;
pub mod execution;
pub mod config;
pub mod query;
pub mod export;

// ============================================================================
// Re-exports: Lanes and messages
// ============================================================================

pub use lane::{LaneMask, LaneScalar, LaneVector};
pub use message::{Combinable, Combiner, Message};

// ============================================================================
// Re-exports: Model and storage
// ============================================================================

pub use model::{Edge, EdgeDir, EdgeRole, Rating, VertexId};
pub use storage::{GraphStore, MemoryGraph};

// ============================================================================
// Re-exports: Programs and execution
// ============================================================================

pub use program::{
    Algorithm, EdgeContext, VertexProgram,
    ShortestPath, EdgeWeight, Reachability, GreedyColoring,
    LatentFactors, LatentParams, LatentState, LatentBlock,
};
pub use execution::{Engine, RunStats, Termination};
pub use config::EngineConfig;
pub use query::{Query, QuerySet};
pub use export::{export_json, export_tsv, ExportLanes, LaneExport};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lane-count mismatch: expected {expected} lanes, got {got}")]
    LaneCountMismatch { expected: usize, got: usize },

    #[error("Unknown edge direction '{0}' (expected in, out, all or none)")]
    UnknownEdgeDirection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Color capacity exhausted at vertex {vertex}, lane {lane}: all 64 colors used by neighbors")]
    ColorCapacityExhausted { vertex: VertexId, lane: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
