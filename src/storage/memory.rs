//! In-memory graph store.
//!
//! Dense vertex indices in insertion order, a hash index from [`VertexId`],
//! and per-vertex in/out edge lists. Edges are added once at load time and
//! never removed.
//!
//! ## Limitations
//!
//! - **Append-only**: no vertex or edge deletion.
//! - **Parallel edges are kept**: adding the same `(src, dst)` twice yields
//!   two edges, both walked by gather and scatter.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::model::{Edge, EdgeDir, VertexId};
use super::GraphStore;

// ============================================================================
// MemoryGraph
// ============================================================================

struct EdgeSlot<E> {
    src: usize,
    dst: usize,
    data: E,
}

/// In-memory directed graph with edge data `E`.
pub struct MemoryGraph<E> {
    ids: Vec<VertexId>,
    index: HashMap<VertexId, usize>,
    edges: Vec<EdgeSlot<E>>,
    /// vertex idx → edge slots leaving it
    out_adj: Vec<SmallVec<[usize; 4]>>,
    /// vertex idx → edge slots entering it
    in_adj: Vec<SmallVec<[usize; 4]>>,
}

impl<E> Default for MemoryGraph<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> MemoryGraph<E> {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            out_adj: Vec::new(),
            in_adj: Vec::new(),
        }
    }

    /// Build a graph from an edge list; endpoints are created on first use.
    pub fn from_edges(edges: impl IntoIterator<Item = Edge<E>>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge.src, edge.dst, edge.data);
        }
        graph
    }

    /// Insert `id` if absent; returns its dense index either way.
    pub fn add_vertex(&mut self, id: impl Into<VertexId>) -> usize {
        let id = id.into();
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id);
        self.index.insert(id, idx);
        self.out_adj.push(SmallVec::new());
        self.in_adj.push(SmallVec::new());
        idx
    }

    /// Add a directed edge `src → dst`, creating missing endpoints.
    pub fn add_edge(&mut self, src: impl Into<VertexId>, dst: impl Into<VertexId>, data: E) {
        let s = self.add_vertex(src);
        let d = self.add_vertex(dst);
        let slot = self.edges.len();
        self.edges.push(EdgeSlot { src: s, dst: d, data });
        self.out_adj[s].push(slot);
        self.in_adj[d].push(slot);
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.index.contains_key(&id)
    }

    /// All vertex ids in dense-index order.
    pub fn vertex_ids(&self) -> &[VertexId] {
        &self.ids
    }

    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_adj[idx].len()
    }

    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_adj[idx].len()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = Edge<&E>> + '_ {
        self.edges.iter().map(|e| Edge {
            src: self.ids[e.src],
            dst: self.ids[e.dst],
            data: &e.data,
        })
    }
}

impl<E: Send + Sync> GraphStore for MemoryGraph<E> {
    type EdgeData = E;

    fn vertex_count(&self) -> usize {
        self.ids.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn vertex_id(&self, idx: usize) -> VertexId {
        self.ids[idx]
    }

    fn index_of(&self, id: VertexId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    fn neighbors(&self, idx: usize, dir: EdgeDir) -> impl Iterator<Item = (usize, &E)> + '_ {
        let outs: &[usize] = if dir.includes_out() { self.out_adj[idx].as_slice() } else { &[] };
        let ins: &[usize] = if dir.includes_in() { self.in_adj[idx].as_slice() } else { &[] };
        let out_iter = outs.iter().map(move |&slot| {
            let e = &self.edges[slot];
            (e.dst, &e.data)
        });
        let in_iter = ins.iter().map(move |&slot| {
            let e = &self.edges[slot];
            (e.src, &e.data)
        });
        out_iter.chain(in_iter)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MemoryGraph<i32> {
        MemoryGraph::from_edges([
            Edge::new(1, 2, 1),
            Edge::new(2, 3, 2),
            Edge::new(1, 3, 5),
        ])
    }

    #[test]
    fn vertices_are_created_on_first_use() {
        let g = triangle();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.vertex_ids(), &[VertexId(1), VertexId(2), VertexId(3)]);
        assert_eq!(g.index_of(VertexId(3)), Some(2));
        assert_eq!(g.index_of(VertexId(9)), None);
    }

    #[test]
    fn add_vertex_is_idempotent() {
        let mut g = triangle();
        assert_eq!(g.add_vertex(2u64), 1);
        assert_eq!(g.vertex_count(), 3);
    }

    #[test]
    fn neighbors_by_direction() {
        let g = triangle();
        let v3 = g.index_of(VertexId(3)).unwrap();

        let ins: Vec<_> = g.neighbors(v3, EdgeDir::In).map(|(o, &w)| (g.vertex_id(o), w)).collect();
        assert_eq!(ins, vec![(VertexId(2), 2), (VertexId(1), 5)]);

        assert_eq!(g.neighbors(v3, EdgeDir::Out).count(), 0);
        assert_eq!(g.neighbors(v3, EdgeDir::None).count(), 0);

        let v1 = g.index_of(VertexId(1)).unwrap();
        assert_eq!(g.neighbors(v1, EdgeDir::All).count(), 2);
        assert_eq!(g.out_degree(v1), 2);
        assert_eq!(g.in_degree(v1), 0);
    }

    #[test]
    fn edges_report_external_ids() {
        let g = triangle();
        let last = g.edges().last().unwrap();
        assert_eq!((last.src, last.dst, *last.data), (VertexId(1), VertexId(3), 5));
    }
}
