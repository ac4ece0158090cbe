//! # Graph Model
//!
//! Plain data shared by storage, vertex programs and the engine.
//! No I/O and no engine state here.

pub mod vertex;
pub mod edge;

pub use vertex::VertexId;
pub use edge::{Edge, EdgeDir, EdgeRole, Rating};
