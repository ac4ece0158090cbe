//! Latent-factor learning by stochastic gradient descent, one independent
//! model per lane.
//!
//! Every vertex (user or item) holds a `dims`-dimensional factor vector per
//! lane. Across each training edge the prediction is the dot product of the
//! two endpoints' factors, clamped to `[min_val, max_val]`; the gathered
//! gradient is `err * other`, summed over training edges, and apply steps
//!
//! ```text
//! v += gamma * (grad - lambda * v)
//! ```
//!
//! on every tracked lane whose update budget is not spent. Gradients are
//! summed, so the run requires exactly-once message delivery.

use bytes::{Buf, BufMut};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::lane::{check_lanes, LaneMask, LaneVector};
use crate::message::{Combinable, Combiner, Message};
use crate::model::{EdgeDir, EdgeRole, Rating, VertexId};
use crate::storage::GraphStore;
use crate::{Error, Result};
use super::{Algorithm, EdgeContext, VertexProgram};

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatentParams {
    /// Latent dimensions per lane.
    pub dims: usize,
    /// Regularization.
    pub lambda: f64,
    /// Step size.
    pub gamma: f64,
    pub min_val: f64,
    pub max_val: f64,
    /// Applies per lane per vertex before the lane stops updating.
    pub max_updates: u32,
    /// Initial factors are uniform in `[-init_scale, init_scale)`.
    pub init_scale: f64,
    pub seed: u64,
}

impl Default for LatentParams {
    fn default() -> Self {
        Self {
            dims: 5,
            lambda: 0.001,
            gamma: 0.001,
            min_val: -1e100,
            max_val: 1e100,
            max_updates: 20,
            init_scale: 0.1,
            seed: 0,
        }
    }
}

impl LatentParams {
    /// Reject parameter sets no run can use.
    pub fn validate(&self) -> Result<()> {
        if self.dims == 0 {
            return Err(Error::Config("latent dims must be at least 1".into()));
        }
        if self.min_val.is_nan() || self.max_val.is_nan() || self.min_val > self.max_val {
            return Err(Error::Config(format!(
                "latent prediction range [{}, {}] is empty",
                self.min_val, self.max_val
            )));
        }
        for (name, v) in [("lambda", self.lambda), ("gamma", self.gamma), ("init_scale", self.init_scale)] {
            if !v.is_finite() {
                return Err(Error::Config(format!("latent {name} must be finite, got {v}")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// LatentBlock
// ============================================================================

/// Per-lane factor vectors, stored dimension-major: `dims[d]` holds
/// dimension d of every lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentBlock {
    pub dims: Vec<LaneVector<f64>>,
}

impl LatentBlock {
    pub fn zeros(lanes: usize, dims: usize) -> Self {
        Self { dims: vec![LaneVector::filled(lanes, 0.0); dims] }
    }

    /// Factor vector of one lane.
    pub fn lane(&self, lane: usize) -> Vec<f64> {
        self.dims.iter().map(|d| d.get_single(lane)).collect()
    }

    /// Dot product of two blocks in one lane.
    pub fn dot(&self, other: &LatentBlock, lane: usize) -> f64 {
        self.dims
            .iter()
            .zip(other.dims.iter())
            .map(|(a, b)| a.get_single(lane) * b.get_single(lane))
            .sum()
    }

    #[track_caller]
    fn check_dims(&self, op: &str, other: &LatentBlock) {
        assert!(
            self.dims.len() == other.dims.len(),
            "latent dimension mismatch in {op}: expected {}, got {}",
            self.dims.len(),
            other.dims.len()
        );
    }
}

impl Combinable for LatentBlock {
    fn lanes(&self) -> usize {
        self.dims.first().map_or(0, LaneVector::lanes)
    }

    fn combine(&mut self, other: &Self, op: Combiner, within: Option<&LaneMask>) {
        self.check_dims("LatentBlock::combine", other);
        for (a, b) in self.dims.iter_mut().zip(other.dims.iter()) {
            a.combine(b, op, within);
        }
    }

    fn assign(&mut self, other: &Self, within: &LaneMask) {
        self.check_dims("LatentBlock::assign", other);
        for (a, b) in self.dims.iter_mut().zip(other.dims.iter()) {
            a.set_masked(b, within);
        }
    }

    fn reset(&mut self, op: Combiner, within: &LaneMask) {
        for d in self.dims.iter_mut() {
            d.fill_masked(op.identity(), within);
        }
    }

    fn encode<B: BufMut>(&self, track: Option<&LaneMask>, out: &mut B) {
        out.put_u64_le(self.dims.len() as u64);
        for d in &self.dims {
            d.encode(track, out);
        }
    }

    fn decode<B: Buf>(src: &mut B, track: Option<&LaneMask>, op: Combiner) -> Result<Self> {
        if src.remaining() < 8 {
            return Err(Error::Codec("LatentBlock::decode: truncated dimension header".into()));
        }
        let n = src.get_u64_le();
        let mut dims = Vec::new();
        for _ in 0..n {
            let d = <LaneVector<f64> as Combinable>::decode(src, track, op)?;
            if let Some(first) = dims.first().map(LaneVector::lanes) {
                if first != d.lanes() {
                    return Err(Error::LaneCountMismatch { expected: first, got: d.lanes() });
                }
            }
            dims.push(d);
        }
        Ok(Self { dims })
    }
}

// ============================================================================
// Program
// ============================================================================

/// Vertex state: factors plus the number of applies each lane has taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentState {
    pub factors: LatentBlock,
    pub updates: LaneVector<u32>,
}

#[derive(Debug, Clone)]
pub struct LatentFactors {
    lanes: usize,
    params: LatentParams,
}

impl LatentFactors {
    /// Fails with [`Error::Config`] if `params` do not validate.
    pub fn new(lanes: usize, params: LatentParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { lanes, params })
    }

    pub fn params(&self) -> &LatentParams {
        &self.params
    }

    fn predict(&self, a: &LatentBlock, b: &LatentBlock, lane: usize) -> f64 {
        a.dot(b, lane).clamp(self.params.min_val, self.params.max_val)
    }

    /// Root-mean-square prediction error of `lane` over every edge with
    /// `role`. `states` is indexed by the graph's dense vertex index. Returns
    /// 0.0 when no edge has that role.
    pub fn rmse<G>(&self, graph: &G, states: &[LatentState], lane: usize, role: EdgeRole) -> f64
    where
        G: GraphStore<EdgeData = Rating>,
    {
        let mut sum = 0.0;
        let mut n = 0usize;
        for idx in 0..graph.vertex_count() {
            for (dst, rating) in graph.neighbors(idx, EdgeDir::Out) {
                if rating.role != role {
                    continue;
                }
                let pred = self.predict(&states[idx].factors, &states[dst].factors, lane);
                let err = rating.obs - pred;
                sum += err * err;
                n += 1;
            }
        }
        if n == 0 { 0.0 } else { (sum / n as f64).sqrt() }
    }
}

impl VertexProgram for LatentFactors {
    type State = LatentState;
    type EdgeData = Rating;
    type Delta = LatentBlock;

    const ALGORITHM: Algorithm = Algorithm::LatentFactors;

    fn lanes(&self) -> usize {
        self.lanes
    }

    fn combiner(&self) -> Combiner {
        Combiner::Sum
    }

    fn gather_edges(&self, _directed: bool) -> EdgeDir {
        EdgeDir::All
    }

    fn scatter_edges(&self, _directed: bool) -> EdgeDir {
        EdgeDir::All
    }

    fn initial_state(&self, vertex: VertexId) -> LatentState {
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed ^ vertex.0.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let mut factors = LatentBlock::zeros(self.lanes, self.params.dims);
        for lane in 0..self.lanes {
            for d in factors.dims.iter_mut() {
                d.set_single(rng.gen_range(-1.0..1.0) * self.params.init_scale, lane);
            }
        }
        LatentState { factors, updates: LaneVector::new(self.lanes) }
    }

    fn empty_delta(&self) -> LatentBlock {
        LatentBlock::zeros(self.lanes, self.params.dims)
    }

    fn source_message(&self, lane: usize) -> Message<LatentBlock> {
        Message::tracked(self.empty_delta(), LaneMask::single(self.lanes, lane))
    }

    fn gather(&self, ctx: &EdgeContext<'_, LatentState, Rating>) -> Option<Message<LatentBlock>> {
        if ctx.edge.role != EdgeRole::Train {
            return None;
        }
        let mine = &ctx.state.factors;
        let other = &ctx.other_state.factors;
        let mut grad = self.empty_delta();
        for lane in 0..self.lanes {
            let err = ctx.edge.obs - self.predict(mine, other, lane);
            for (g, o) in grad.dims.iter_mut().zip(other.dims.iter()) {
                g.set_single(err * o.get_single(lane), lane);
            }
        }
        Some(Message::new(grad))
    }

    fn apply(&self, _vertex: VertexId, state: &mut LatentState, acc: &Message<LatentBlock>) -> Result<LaneMask> {
        check_lanes("LatentFactors::apply", state.updates.lanes(), acc.lanes());
        let budget = LaneVector::filled(self.lanes, self.params.max_updates);
        let effective = acc.effective_lanes();
        let active = state.updates.lt_mask(&budget, Some(&effective));
        let LatentState { factors, updates } = state;
        for (v, g) in factors.dims.iter_mut().zip(acc.delta.dims.iter()) {
            for lane in active.iter_set() {
                let x = v.get_single(lane);
                v.set_single(x + self.params.gamma * (g.get_single(lane) - self.params.lambda * x), lane);
            }
        }
        updates.add_scalar_masked(1, &active);
        Ok(active)
    }

    fn scatter(&self, ctx: &EdgeContext<'_, LatentState, Rating>, send: &LaneMask) -> Option<Message<LatentBlock>> {
        (ctx.edge.role == EdgeRole::Train).then(|| Message::tracked(self.empty_delta(), send.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(lanes: Vec<Vec<f64>>) -> LatentBlock {
        // lanes[lane][dim] -> dimension-major
        let dims = lanes[0].len();
        LatentBlock {
            dims: (0..dims)
                .map(|d| LaneVector::from_vec(lanes.iter().map(|l| l[d]).collect()))
                .collect(),
        }
    }

    fn params() -> LatentParams {
        LatentParams { dims: 2, gamma: 0.5, lambda: 0.0, ..LatentParams::default() }
    }

    #[test]
    fn initial_factors_are_reproducible_per_vertex() {
        let p = LatentFactors::new(3, LatentParams::default()).unwrap();
        assert_eq!(p.initial_state(VertexId(7)), p.initial_state(VertexId(7)));
        assert_ne!(p.initial_state(VertexId(7)), p.initial_state(VertexId(8)));
        let s = p.initial_state(VertexId(7));
        assert!(s.factors.dims.iter().flat_map(|d| d.iter()).all(|x| x.abs() <= 0.1));
    }

    #[test]
    fn zero_dims_is_a_config_error() {
        let params = LatentParams { dims: 0, ..LatentParams::default() };
        assert!(matches!(LatentFactors::new(2, params), Err(Error::Config(_))));
    }

    #[test]
    fn inverted_prediction_range_is_a_config_error() {
        let params = LatentParams { min_val: 5.0, max_val: 1.0, ..LatentParams::default() };
        assert!(matches!(LatentFactors::new(2, params), Err(Error::Config(_))));
        let params = LatentParams { gamma: f64::NAN, ..LatentParams::default() };
        assert!(matches!(LatentFactors::new(2, params), Err(Error::Config(_))));
    }

    #[test]
    fn params_load_from_json_with_defaults() {
        let params: LatentParams = serde_json::from_str(r#"{ "dims": 3, "seed": 9 }"#).unwrap();
        assert_eq!(params.dims, 3);
        assert_eq!(params.max_updates, LatentParams::default().max_updates);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn gather_is_error_times_other() {
        let p = LatentFactors::new(1, params()).unwrap();
        let me = LatentState { factors: block(vec![vec![1.0, 0.0]]), updates: LaneVector::new(1) };
        let other = LatentState { factors: block(vec![vec![2.0, 3.0]]), updates: LaneVector::new(1) };
        let edge = Rating::train(5.0);
        let ctx = EdgeContext { vertex: VertexId(1), state: &me, other: VertexId(2), other_state: &other, edge: &edge };
        // pred = 1*2 + 0*3 = 2, err = 3
        let msg = p.gather(&ctx).unwrap();
        assert_eq!(msg.delta.lane(0), vec![6.0, 9.0]);

        let held_out = Rating::validate(5.0);
        let ctx = EdgeContext { edge: &held_out, ..ctx };
        assert!(p.gather(&ctx).is_none());
    }

    #[test]
    fn apply_steps_tracked_lanes_until_budget_spent() {
        let mut params = params();
        params.max_updates = 1;
        let p = LatentFactors::new(2, params).unwrap();
        let mut state = LatentState {
            factors: block(vec![vec![1.0, 1.0], vec![1.0, 1.0]]),
            updates: LaneVector::new(2),
        };
        let grad = block(vec![vec![2.0, -2.0], vec![4.0, 4.0]]);
        let acc = Message::tracked(grad, LaneMask::single(2, 0));

        let changed = p.apply(VertexId(1), &mut state, &acc).unwrap();
        assert_eq!(changed.iter_set().collect::<Vec<_>>(), vec![0]);
        assert_eq!(state.factors.lane(0), vec![2.0, 0.0]);
        assert_eq!(state.factors.lane(1), vec![1.0, 1.0]);

        let changed = p.apply(VertexId(1), &mut state, &acc).unwrap();
        assert!(changed.all_zero());
        assert_eq!(state.factors.lane(0), vec![2.0, 0.0]);
    }

    #[test]
    fn block_wire_round_trip_with_track() {
        let b = block(vec![vec![1.5, 2.5], vec![3.5, 4.5]]);
        let track = LaneMask::single(2, 1);
        let mut buf = Vec::new();
        b.encode(Some(&track), &mut buf);
        let back = LatentBlock::decode(&mut &buf[..], Some(&track), Combiner::Sum).unwrap();
        assert_eq!(back.lane(1), vec![3.5, 4.5]);
        assert_eq!(back.lane(0), vec![0.0, 0.0]);
    }
}
