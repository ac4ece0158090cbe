//! # Graph Storage Contract
//!
//! The engine walks a fully loaded graph through [`GraphStore`]. Vertices
//! are addressed by a dense index `0..vertex_count()` so per-vertex engine
//! state can live in plain vectors; [`VertexId`] is only the external name.
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryGraph` | `memory` | In-memory adjacency lists |

pub mod memory;

use crate::model::{EdgeDir, VertexId};

pub use memory::MemoryGraph;

/// Read-only view of a loaded graph.
///
/// Edge data is immutable for the lifetime of a run.
pub trait GraphStore: Sync {
    type EdgeData: Send + Sync;

    fn vertex_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    /// External id of the vertex at dense index `idx`.
    fn vertex_id(&self, idx: usize) -> VertexId;

    /// Dense index of `id`, if the vertex exists.
    fn index_of(&self, id: VertexId) -> Option<usize>;

    /// Incident edges of `idx` selected by `dir`, as `(other endpoint, data)`.
    /// With [`EdgeDir::All`], out-edges come first, then in-edges.
    fn neighbors(
        &self,
        idx: usize,
        dir: EdgeDir,
    ) -> impl Iterator<Item = (usize, &Self::EdgeData)> + '_;
}
