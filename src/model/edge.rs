//! Edges, edge-direction selectors and rating edge data.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use super::VertexId;
use crate::Error;

/// A directed edge carrying immutable data `E` (weight, rating, or `()`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<E> {
    pub src: VertexId,
    pub dst: VertexId,
    pub data: E,
}

impl<E> Edge<E> {
    pub fn new(src: impl Into<VertexId>, dst: impl Into<VertexId>, data: E) -> Self {
        Self { src: src.into(), dst: dst.into(), data }
    }

    /// The endpoint that is not `v`.
    pub fn other(&self, v: VertexId) -> VertexId {
        if v == self.src { self.dst } else { self.src }
    }
}

/// Which incident edges a gather or scatter phase walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EdgeDir {
    /// Edges whose target is this vertex.
    In,
    /// Edges whose source is this vertex.
    Out,
    All,
    None,
}

impl EdgeDir {
    pub fn includes_in(self) -> bool {
        matches!(self, EdgeDir::In | EdgeDir::All)
    }

    pub fn includes_out(self) -> bool {
        matches!(self, EdgeDir::Out | EdgeDir::All)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeDir::In => "in",
            EdgeDir::Out => "out",
            EdgeDir::All => "all",
            EdgeDir::None => "none",
        }
    }
}

impl fmt::Display for EdgeDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeDir {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" | "in_edges" => Ok(EdgeDir::In),
            "out" | "out_edges" => Ok(EdgeDir::Out),
            "all" | "all_edges" => Ok(EdgeDir::All),
            "none" | "no_edges" => Ok(EdgeDir::None),
            _ => Err(Error::UnknownEdgeDirection(s.to_string())),
        }
    }
}

impl TryFrom<String> for EdgeDir {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EdgeDir> for String {
    fn from(dir: EdgeDir) -> Self {
        dir.as_str().to_string()
    }
}

/// How a rating edge is used by latent-factor learning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRole {
    /// Observed and trained on.
    Train,
    /// Observed, held out for error reporting.
    Validate,
    /// Unobserved; the value is not meaningful.
    #[default]
    Predict,
}

/// Observed rating on a user–item edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    pub obs: f64,
    pub role: EdgeRole,
}

impl Rating {
    pub fn train(obs: f64) -> Self {
        Self { obs, role: EdgeRole::Train }
    }

    pub fn validate(obs: f64) -> Self {
        Self { obs, role: EdgeRole::Validate }
    }
}
