//! Result export — dump final per-lane vertex state.
//!
//! ```text
//! Engine (after run) → export_tsv()  → vertex<TAB>lane0<TAB>lane1 ...
//!                    → export_json() → {"lanes": K, "vertices": [{"id": .., "values": [..]}]}
//! ```
//!
//! Rows are sorted by vertex id. How a lane is written depends on the
//! program that produced it:
//!
//! | Program | TSV cell | JSON value |
//! |---|---|---|
//! | `ShortestPath` | distance, `inf` if unreached | number, `null` if unreached |
//! | `Reachability` | `1` / `0` | `true` / `false` |
//! | `GreedyColoring` | color index, `-` if uncolored | number, `null` if uncolored |
//! | `LatentFactors` | comma-joined factors | array of factors |

use std::io::Write;
use serde_json::{json, Value};

use crate::execution::Engine;
use crate::lane::{LaneMask, LaneScalar, LaneVector};
use crate::model::VertexId;
use crate::program::coloring::color_index;
use crate::program::sssp::EdgeWeight;
use crate::program::{GreedyColoring, LatentFactors, LatentState, Reachability, ShortestPath, VertexProgram};
use crate::storage::GraphStore;
use crate::Result;

/// Vertex state that can be written out lane by lane.
pub trait LaneExport {
    /// One TSV cell per lane.
    fn lane_cells(&self) -> Vec<String>;

    /// One JSON value per lane.
    fn lane_json(&self) -> Vec<Value>;
}

impl<T: LaneScalar> LaneExport for LaneVector<T> {
    fn lane_cells(&self) -> Vec<String> {
        self.iter()
            .map(|v| if v.is_infinite() { "inf".to_string() } else { v.to_string() })
            .collect()
    }

    fn lane_json(&self) -> Vec<Value> {
        self.iter()
            .map(|&v| if v.is_infinite() { Value::Null } else { json!(v) })
            .collect()
    }
}

impl LaneExport for LaneMask {
    fn lane_cells(&self) -> Vec<String> {
        (0..self.lanes()).map(|l| if self.test_bit(l) { "1" } else { "0" }.to_string()).collect()
    }

    fn lane_json(&self) -> Vec<Value> {
        (0..self.lanes()).map(|l| Value::Bool(self.test_bit(l))).collect()
    }
}

impl LaneExport for LatentState {
    fn lane_cells(&self) -> Vec<String> {
        (0..self.updates.lanes())
            .map(|l| {
                let factors: Vec<String> = self.factors.lane(l).iter().map(f64::to_string).collect();
                factors.join(",")
            })
            .collect()
    }

    fn lane_json(&self) -> Vec<Value> {
        (0..self.updates.lanes()).map(|l| json!(self.factors.lane(l))).collect()
    }
}

/// Per-program rendering of a final vertex state.
pub trait ExportLanes: VertexProgram {
    fn state_cells(&self, state: &Self::State) -> Vec<String>;

    fn state_json(&self, state: &Self::State) -> Vec<Value>;
}

impl<T, E> ExportLanes for ShortestPath<T, E>
where
    T: LaneScalar,
    E: EdgeWeight<T> + Send + Sync,
{
    fn state_cells(&self, state: &LaneVector<T>) -> Vec<String> {
        state.lane_cells()
    }

    fn state_json(&self, state: &LaneVector<T>) -> Vec<Value> {
        state.lane_json()
    }
}

impl<E: Send + Sync> ExportLanes for Reachability<E> {
    fn state_cells(&self, state: &LaneMask) -> Vec<String> {
        state.lane_cells()
    }

    fn state_json(&self, state: &LaneMask) -> Vec<Value> {
        state.lane_json()
    }
}

// One-hot words are written as color indices.
impl<E: Send + Sync> ExportLanes for GreedyColoring<E> {
    fn state_cells(&self, state: &LaneVector<u64>) -> Vec<String> {
        state
            .iter()
            .map(|&c| color_index(c).map_or_else(|| "-".to_string(), |i| i.to_string()))
            .collect()
    }

    fn state_json(&self, state: &LaneVector<u64>) -> Vec<Value> {
        state.iter().map(|&c| color_index(c).map_or(Value::Null, |i| json!(i))).collect()
    }
}

impl ExportLanes for LatentFactors {
    fn state_cells(&self, state: &LatentState) -> Vec<String> {
        state.lane_cells()
    }

    fn state_json(&self, state: &LatentState) -> Vec<Value> {
        state.lane_json()
    }
}

fn sorted_rows<'a, G, P>(engine: &'a Engine<'_, G, P>) -> Vec<(VertexId, &'a P::State)>
where
    G: GraphStore,
    P: VertexProgram<EdgeData = G::EdgeData>,
{
    let mut rows: Vec<_> = engine.vertex_states().collect();
    rows.sort_by_key(|(id, _)| *id);
    rows
}

/// Write one tab-separated row per vertex: id, then one cell per lane.
pub fn export_tsv<G, P>(engine: &Engine<'_, G, P>, writer: &mut dyn Write) -> Result<()>
where
    G: GraphStore,
    P: VertexProgram<EdgeData = G::EdgeData> + ExportLanes,
{
    let program = engine.program();
    for (id, state) in sorted_rows(engine) {
        write!(writer, "{id}")?;
        for cell in program.state_cells(state) {
            write!(writer, "\t{cell}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write all vertex states as one JSON document.
pub fn export_json<G, P>(engine: &Engine<'_, G, P>, writer: &mut dyn Write) -> Result<()>
where
    G: GraphStore,
    P: VertexProgram<EdgeData = G::EdgeData> + ExportLanes,
{
    let program = engine.program();
    let vertices: Vec<Value> = sorted_rows(engine)
        .into_iter()
        .map(|(id, state)| json!({ "id": id.0, "values": program.state_json(state) }))
        .collect();
    let doc = json!({ "lanes": engine.config().lanes, "vertices": vertices });
    serde_json::to_writer_pretty(&mut *writer, &doc)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_lanes_export_as_inf_and_null() {
        let v = LaneVector::from_vec(vec![3i32, i32::INFINITY]);
        assert_eq!(v.lane_cells(), vec!["3", "inf"]);
        assert_eq!(v.lane_json(), vec![json!(3), Value::Null]);
    }

    #[test]
    fn coloring_lanes_export_as_indices() {
        let p = GreedyColoring::<()>::new(3);
        let state = LaneVector::from_vec(vec![1u64, 4, 0]);
        assert_eq!(p.state_cells(&state), vec!["0", "2", "-"]);
        assert_eq!(p.state_json(&state), vec![json!(0), json!(2), Value::Null]);
    }

    #[test]
    fn mask_lanes_export_as_bits() {
        let m = LaneMask::from_lanes(3, [1]);
        assert_eq!(m.lane_cells(), vec!["0", "1", "0"]);
        assert_eq!(m.lane_json(), vec![json!(false), json!(true), json!(false)]);
    }
}
