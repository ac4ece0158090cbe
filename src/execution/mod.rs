//! Bulk-synchronous superstep engine.
//!
//! Each superstep runs three phases separated by barriers:
//!
//! 1. **gather**: every vertex with a pending message folds the
//!    contributions of its gather edges into that message. Reads states only.
//! 2. **apply**: each such vertex updates its own state and reports the
//!    lanes it changed.
//! 3. **scatter**: vertices with a non-empty changed mask emit messages to
//!    their scatter edges; messages are merged into the receivers' inboxes
//!    for the next superstep.
//!
//! A vertex whose changed mask is all-zero sends nothing, so it cannot
//! reactivate anyone; the run is quiescent when every inbox is empty.
//!
//! With the `parallel` feature each phase runs on rayon's pool. Inbox slots
//! are mutex-guarded so concurrent scatters can merge into them; the combiner
//! is order-independent, so results match the sequential engine.

pub mod stats;

use std::time::Instant;
use parking_lot::Mutex;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::lane::LaneMask;
use crate::message::Message;
use crate::model::{EdgeDir, VertexId};
use crate::program::{EdgeContext, VertexProgram};
use crate::query::QuerySet;
use crate::storage::GraphStore;
use crate::{Error, Result};

pub use stats::{RunStats, Termination};

type Msg<P> = Message<<P as VertexProgram>::Delta>;

/// Drives one vertex program over one graph.
pub struct Engine<'g, G, P>
where
    G: GraphStore,
    P: VertexProgram<EdgeData = G::EdgeData>,
{
    graph: &'g G,
    program: P,
    config: EngineConfig,
    gather_dir: EdgeDir,
    scatter_dir: EdgeDir,
    states: Vec<P::State>,
    inbox: Vec<Mutex<Option<Msg<P>>>>,
}

impl<'g, G, P> Engine<'g, G, P>
where
    G: GraphStore,
    P: VertexProgram<EdgeData = G::EdgeData>,
{
    /// Build an engine with every vertex in its initial state.
    ///
    /// Fails if the config is invalid or disagrees with the program's lane
    /// count.
    pub fn new(graph: &'g G, program: P, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        if program.lanes() != config.lanes {
            return Err(Error::LaneCountMismatch { expected: config.lanes, got: program.lanes() });
        }
        let gather_dir = config.gather.unwrap_or_else(|| program.gather_edges(config.directed));
        let scatter_dir = config.scatter.unwrap_or_else(|| program.scatter_edges(config.directed));

        let n = graph.vertex_count();
        let states = (0..n).map(|idx| program.initial_state(graph.vertex_id(idx))).collect();
        let inbox = (0..n).map(|_| Mutex::new(None)).collect();

        Ok(Self { graph, program, config, gather_dir, scatter_dir, states, inbox })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn graph(&self) -> &'g G {
        self.graph
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    /// Deliver `message` to `vertex`, activating it for the next superstep.
    pub fn signal_source(&self, vertex: VertexId, mut message: Msg<P>) -> Result<()> {
        let idx = self
            .graph
            .index_of(vertex)
            .ok_or_else(|| Error::NotFound(format!("vertex {vertex}")))?;
        if message.lanes() != self.config.lanes {
            return Err(Error::LaneCountMismatch { expected: self.config.lanes, got: message.lanes() });
        }
        if !self.config.tracking {
            message.untrack(self.program.combiner());
        }
        trace!(%vertex, ?message, "signal");
        self.deliver(idx, message);
        Ok(())
    }

    /// Activate every vertex on every lane with an empty message.
    pub fn signal_all(&self) {
        let lanes = self.config.lanes;
        for idx in 0..self.inbox.len() {
            let delta = self.program.empty_delta();
            let message = if self.config.tracking {
                Message::tracked(delta, LaneMask::full(lanes))
            } else {
                Message::new(delta)
            };
            self.deliver(idx, message);
        }
        debug!(vertices = self.inbox.len(), "signalled all vertices");
    }

    /// Seed each query's lane at its source vertex.
    pub fn seed_queries(&self, queries: &QuerySet) -> Result<()> {
        for q in queries.iter() {
            if q.lane >= self.config.lanes {
                return Err(Error::Config(format!(
                    "query lane {} out of range for {} lanes",
                    q.lane, self.config.lanes
                )));
            }
            self.signal_source(q.source, self.program.source_message(q.lane))?;
        }
        Ok(())
    }

    fn deliver(&self, idx: usize, mut message: Msg<P>) {
        let op = self.program.combiner();
        let mut slot = self.inbox[idx].lock();
        match slot.as_mut() {
            Some(pending) => pending.merge(&message, op),
            None => {
                message.normalize(op);
                *slot = Some(message);
            }
        }
    }

    /// True if any vertex has a message waiting.
    pub fn has_pending(&self) -> bool {
        self.inbox.iter().any(|slot| slot.lock().is_some())
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    /// Run supersteps until quiescence or the iteration cap.
    ///
    /// An error from `apply` aborts the run; states then reflect the
    /// supersteps completed before the failing one, plus any applies that
    /// already ran in it.
    pub fn run(&mut self) -> Result<RunStats> {
        let clock = Instant::now();
        let mut stats = RunStats::start();
        info!(
            algorithm = %P::ALGORITHM,
            lanes = self.config.lanes,
            vertices = self.graph.vertex_count(),
            edges = self.graph.edge_count(),
            tracking = self.config.tracking,
            gather = %self.gather_dir,
            scatter = %self.scatter_dir,
            "run started"
        );

        loop {
            let cap = self.config.max_iterations;
            if cap > 0 && stats.supersteps >= cap {
                if self.has_pending() {
                    stats.termination = Termination::IterationCap;
                    warn!(supersteps = stats.supersteps, "iteration cap reached before quiescence");
                }
                break;
            }

            let inbox: Vec<Option<Msg<P>>> = self.inbox.iter_mut().map(|slot| slot.get_mut().take()).collect();
            let active = inbox.iter().filter(|m| m.is_some()).count();
            if active == 0 {
                break;
            }

            let accs = self.gather_phase(inbox);
            let sends = self.apply_phase(&accs)?;
            let messages = self.scatter_phase(&sends);

            stats.supersteps += 1;
            stats.updates += active as u64;
            stats.messages += messages;
            debug!(
                superstep = stats.supersteps,
                active,
                changed = sends.len(),
                messages,
                "superstep done"
            );
        }

        stats.elapsed = clock.elapsed();
        info!(
            supersteps = stats.supersteps,
            updates = stats.updates,
            messages = stats.messages,
            elapsed_ms = stats.elapsed_ms(),
            termination = %stats.termination,
            "run finished"
        );
        Ok(stats)
    }

    /// Fold the gather edges of `idx` into its pending message.
    fn gather_at(&self, idx: usize, mut acc: Msg<P>) -> Msg<P> {
        let op = self.program.combiner();
        let focus = if self.config.tracking { acc.track.clone() } else { None };
        let vertex = self.graph.vertex_id(idx);
        for (other, edge) in self.graph.neighbors(idx, self.gather_dir) {
            let ctx = EdgeContext {
                vertex,
                state: &self.states[idx],
                other: self.graph.vertex_id(other),
                other_state: &self.states[other],
                edge,
            };
            if let Some(mut contribution) = self.program.gather(&ctx) {
                match &focus {
                    Some(f) => contribution.restrict(f, op),
                    None => contribution.untrack(op),
                }
                acc.merge(&contribution, op);
            }
        }
        acc
    }

    /// Run `apply` for `idx`; return the lanes to send, if any.
    fn apply_at(
        program: &P,
        tracking: bool,
        vertex: VertexId,
        state: &mut P::State,
        acc: &Msg<P>,
    ) -> Result<Option<LaneMask>> {
        let mut changed = program.apply(vertex, state, acc)?;
        if changed.all_zero() {
            return Ok(None);
        }
        if tracking {
            changed.and_assign(&acc.effective_lanes());
            if changed.all_zero() {
                return Ok(None);
            }
            Ok(Some(changed))
        } else {
            Ok(Some(LaneMask::full(program.lanes())))
        }
    }

    /// Emit scatter messages from `idx`; returns how many were sent.
    fn scatter_at(&self, idx: usize, send: &LaneMask) -> u64 {
        let vertex = self.graph.vertex_id(idx);
        let mut sent = 0;
        for (other, edge) in self.graph.neighbors(idx, self.scatter_dir) {
            let ctx = EdgeContext {
                vertex,
                state: &self.states[idx],
                other: self.graph.vertex_id(other),
                other_state: &self.states[other],
                edge,
            };
            if let Some(mut message) = self.program.scatter(&ctx, send) {
                if !self.config.tracking {
                    message.untrack(self.program.combiner());
                }
                self.deliver(other, message);
                sent += 1;
            }
        }
        sent
    }

    #[cfg(not(feature = "parallel"))]
    fn gather_phase(&self, inbox: Vec<Option<Msg<P>>>) -> Vec<Option<Msg<P>>> {
        inbox
            .into_iter()
            .enumerate()
            .map(|(idx, m)| m.map(|m| self.gather_at(idx, m)))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn gather_phase(&self, inbox: Vec<Option<Msg<P>>>) -> Vec<Option<Msg<P>>> {
        inbox
            .into_par_iter()
            .enumerate()
            .map(|(idx, m)| m.map(|m| self.gather_at(idx, m)))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn apply_phase(&mut self, accs: &[Option<Msg<P>>]) -> Result<Vec<(usize, LaneMask)>> {
        let (program, graph, tracking) = (&self.program, self.graph, self.config.tracking);
        self.states
            .iter_mut()
            .zip(accs.iter())
            .enumerate()
            .filter_map(|(idx, (state, acc))| {
                let acc = acc.as_ref()?;
                Self::apply_at(program, tracking, graph.vertex_id(idx), state, acc)
                    .map(|send| send.map(|s| (idx, s)))
                    .transpose()
            })
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn apply_phase(&mut self, accs: &[Option<Msg<P>>]) -> Result<Vec<(usize, LaneMask)>> {
        let (program, graph, tracking) = (&self.program, self.graph, self.config.tracking);
        self.states
            .par_iter_mut()
            .zip(accs.par_iter())
            .enumerate()
            .filter_map(|(idx, (state, acc))| {
                let acc = acc.as_ref()?;
                Self::apply_at(program, tracking, graph.vertex_id(idx), state, acc)
                    .map(|send| send.map(|s| (idx, s)))
                    .transpose()
            })
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn scatter_phase(&self, sends: &[(usize, LaneMask)]) -> u64 {
        sends.iter().map(|(idx, send)| self.scatter_at(*idx, send)).sum()
    }

    #[cfg(feature = "parallel")]
    fn scatter_phase(&self, sends: &[(usize, LaneMask)]) -> u64 {
        sends.par_iter().map(|(idx, send)| self.scatter_at(*idx, send)).sum()
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Final (or current) state of `vertex`.
    pub fn state_of(&self, vertex: VertexId) -> Option<&P::State> {
        self.graph.index_of(vertex).map(|idx| &self.states[idx])
    }

    /// States indexed by dense vertex index.
    pub fn states(&self) -> &[P::State] {
        &self.states
    }

    /// `(id, state)` for every vertex, in dense-index order.
    pub fn vertex_states(&self) -> impl Iterator<Item = (VertexId, &P::State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(idx, s)| (self.graph.vertex_id(idx), s))
    }

    pub fn into_states(self) -> Vec<P::State> {
        self.states
    }
}

// ============================================================================
// Tests
// ============================================================================
