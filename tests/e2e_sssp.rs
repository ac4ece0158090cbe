//! End-to-end tests for batched shortest-distance queries.
//!
//! Each test builds a `MemoryGraph`, seeds one or more query lanes and runs
//! the engine to quiescence.

use lanegraph::{
    Edge, Engine, EngineConfig, GraphStore, MemoryGraph, QuerySet, ShortestPath, Termination,
    VertexId,
};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// Helpers
// ============================================================================

/// (1→2, w=1), (2→3, w=2), (1→3, w=5)
fn weighted_triangle() -> MemoryGraph<i32> {
    MemoryGraph::from_edges([Edge::new(1, 2, 1), Edge::new(2, 3, 2), Edge::new(1, 3, 5)])
}

/// Path 1–2–3–4 with unit weights, stored one direction only.
fn path4() -> MemoryGraph<i32> {
    MemoryGraph::from_edges([Edge::new(1, 2, 1), Edge::new(2, 3, 1), Edge::new(3, 4, 1)])
}

fn lane_distances(engine: &Engine<'_, MemoryGraph<i32>, ShortestPath<i32>>, lane: usize) -> Vec<i32> {
    let mut ids: Vec<VertexId> = engine.graph().vertex_ids().to_vec();
    ids.sort();
    ids.iter().map(|&v| engine.state_of(v).unwrap().get_single(lane)).collect()
}

fn run_sssp<'g>(
    graph: &'g MemoryGraph<i32>,
    config: EngineConfig,
    sources: &[u64],
) -> Engine<'g, MemoryGraph<i32>, ShortestPath<i32>> {
    let mut engine = Engine::new(graph, ShortestPath::new(config.lanes), config).unwrap();
    engine.seed_queries(&QuerySet::from_sources(sources.iter().copied())).unwrap();
    let stats = engine.run().unwrap();
    assert_eq!(stats.termination, Termination::Quiescence);
    engine
}

// ============================================================================
// 1. Single query: shortest path beats the direct edge
// ============================================================================

#[test]
fn test_triangle_prefers_two_hop_path() {
    let g = weighted_triangle();
    let engine = run_sssp(&g, EngineConfig::with_lanes(1), &[1]);
    assert_eq!(lane_distances(&engine, 0), vec![0, 1, 3]);
}

// ============================================================================
// 2. Batched lanes are independent
// ============================================================================

#[test]
fn test_two_lanes_from_opposite_ends() {
    let g = path4();
    let engine = run_sssp(&g, EngineConfig::with_lanes(2).directed(false), &[1, 4]);
    assert_eq!(lane_distances(&engine, 0), vec![0, 1, 2, 3]);
    assert_eq!(lane_distances(&engine, 1), vec![3, 2, 1, 0]);
}

#[test]
fn test_unseeded_lane_stays_infinite() {
    let g = path4();
    let engine = run_sssp(&g, EngineConfig::with_lanes(3).directed(false), &[2]);
    assert_eq!(lane_distances(&engine, 0), vec![1, 0, 1, 2]);
    assert!(lane_distances(&engine, 1).iter().all(|&d| d == i32::MAX));
    assert!(lane_distances(&engine, 2).iter().all(|&d| d == i32::MAX));
}

#[test]
fn test_directed_run_does_not_walk_backwards() {
    let g = path4();
    let engine = run_sssp(&g, EngineConfig::with_lanes(1), &[3]);
    assert_eq!(lane_distances(&engine, 0), vec![i32::MAX, i32::MAX, 0, 1]);
}

// ============================================================================
// 3. Termination
// ============================================================================

#[test]
fn test_quiescence_is_stable() {
    let g = weighted_triangle();
    let mut engine = run_sssp(&g, EngineConfig::with_lanes(1), &[1]);
    let before = engine.states().to_vec();

    assert!(!engine.has_pending());
    let again = engine.run().unwrap();
    assert_eq!(again.supersteps, 0);
    assert_eq!(engine.states(), &before[..]);
}

#[test]
fn test_supersteps_bounded_by_vertex_count() {
    let g = path4();
    let mut engine = Engine::new(&g, ShortestPath::<i32>::new(1), EngineConfig::with_lanes(1)).unwrap();
    engine.seed_queries(&QuerySet::from_sources([1u64])).unwrap();
    let stats = engine.run().unwrap();
    assert!(stats.supersteps <= g.vertex_count() + 1, "took {} supersteps", stats.supersteps);
    assert!(stats.converged());
}

// ============================================================================
// 4. Tracking on and off agree; batched equals independent runs
// ============================================================================

fn random_graph(seed: u64, vertices: u64, edges: usize) -> MemoryGraph<i32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut g = MemoryGraph::new();
    for v in 1..=vertices {
        g.add_vertex(v);
    }
    for _ in 0..edges {
        let s = rng.gen_range(1..=vertices);
        let d = rng.gen_range(1..=vertices);
        g.add_edge(s, d, rng.gen_range(1..20));
    }
    g
}

#[test]
fn test_tracking_flag_does_not_change_results() {
    let g = random_graph(7, 40, 160);
    let sources = [1, 5, 9, 13, 17, 21, 25, 29];
    let tracked = run_sssp(&g, EngineConfig::with_lanes(8), &sources);
    let broadcast = run_sssp(&g, EngineConfig::with_lanes(8).tracking(false), &sources);
    for lane in 0..8 {
        assert_eq!(lane_distances(&tracked, lane), lane_distances(&broadcast, lane), "lane {lane}");
    }
}

#[test]
fn test_batched_lanes_match_single_query_runs() {
    let g = random_graph(42, 30, 90);
    let sources = [3u64, 8, 15, 22];
    let batched = run_sssp(&g, EngineConfig::with_lanes(4).directed(false), &sources);
    for (lane, &src) in sources.iter().enumerate() {
        let single = run_sssp(&g, EngineConfig::with_lanes(1).directed(false), &[src]);
        assert_eq!(lane_distances(&batched, lane), lane_distances(&single, 0), "source {src}");
    }
}

// ============================================================================
// 5. Sentinel arithmetic and hop counts
// ============================================================================

#[test]
fn test_huge_weights_clamp_instead_of_wrapping() {
    let g = MemoryGraph::from_edges([Edge::new(1, 2, i32::MAX - 1), Edge::new(2, 3, 10)]);
    let engine = run_sssp(&g, EngineConfig::with_lanes(1), &[1]);
    let d = lane_distances(&engine, 0);
    assert_eq!(d[1], i32::MAX - 1);
    assert!(d[2] >= d[1], "distance wrapped: {d:?}");
}

#[test]
fn test_unweighted_bfs_counts_hops() {
    let g: MemoryGraph<()> = MemoryGraph::from_edges([
        Edge::new(1, 2, ()),
        Edge::new(1, 3, ()),
        Edge::new(3, 4, ()),
        Edge::new(4, 5, ()),
    ]);
    let mut engine = Engine::new(&g, ShortestPath::<u32, ()>::unweighted(1), EngineConfig::with_lanes(1)).unwrap();
    engine.seed_queries(&QuerySet::from_sources([1u64])).unwrap();
    engine.run().unwrap();
    let hops: Vec<u32> = (1..=5).map(|v| engine.state_of(VertexId(v)).unwrap().get_single(0)).collect();
    assert_eq!(hops, vec![0, 1, 1, 2, 3]);
}
