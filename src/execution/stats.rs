//! Run statistics.

use std::fmt;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No vertex active and no message pending.
    Quiescence,
    /// `max_iterations` supersteps ran with work still pending.
    IterationCap,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::Quiescence => "quiescence",
            Termination::IterationCap => "iteration cap",
        })
    }
}

/// Counters for one `Engine::run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub supersteps: usize,
    /// `apply` calls.
    pub updates: u64,
    /// Messages emitted by scatter, before merging.
    pub messages: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub termination: Termination,
}

impl RunStats {
    pub(crate) fn start() -> Self {
        Self {
            supersteps: 0,
            updates: 0,
            messages: 0,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            termination: Termination::Quiescence,
        }
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Quiescence
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}
