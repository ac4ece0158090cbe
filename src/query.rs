//! Query lists: which source vertex each lane starts from.
//!
//! Query files have two lines, both comma-terminated:
//!
//! ```text
//! num_queries=3,
//! 17,4,230,
//! ```
//!
//! The header count is informational; the id list is authoritative and is
//! truncated to the run's lane count.

use serde::{Deserialize, Serialize};

use crate::model::VertexId;
use crate::{Error, Result};

/// One query instance: lane `lane` is sourced at `source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub source: VertexId,
    pub lane: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySet {
    queries: Vec<Query>,
}

impl QuerySet {
    /// Lane i is sourced at the i-th id.
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VertexId>,
    {
        let queries = sources
            .into_iter()
            .enumerate()
            .map(|(lane, source)| Query { source: source.into(), lane })
            .collect();
        Self { queries }
    }

    /// Sources `1..=lanes`, used when no query list is supplied.
    pub fn default_for(lanes: usize) -> Self {
        Self::from_sources(1..=lanes as u64)
    }

    /// Parse a query file, keeping at most `lanes` queries.
    pub fn parse(text: &str, lanes: usize) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        let header = lines
            .next()
            .ok_or_else(|| Error::Config("query file is empty".into()))?;
        if !header.starts_with("num_queries=") {
            return Err(Error::Config(format!("query file header '{header}' lacks num_queries=")));
        }

        let mut sources = Vec::new();
        for tok in lines.flat_map(|l| l.split(',')).map(str::trim).filter(|t| !t.is_empty()) {
            let id: u64 = tok
                .parse()
                .map_err(|_| Error::Config(format!("bad source id '{tok}' in query file")))?;
            sources.push(VertexId(id));
        }
        if sources.is_empty() {
            return Err(Error::Config("query file lists no sources".into()));
        }
        if sources.len() > lanes {
            tracing::debug!(listed = sources.len(), lanes, "truncating query list to lane count");
            sources.truncate(lanes);
        }
        Ok(Self::from_sources(sources))
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> + '_ {
        self.queries.iter()
    }

    /// Source of `lane`, if the lane is in use.
    pub fn source_of(&self, lane: usize) -> Option<VertexId> {
        self.queries.iter().find(|q| q.lane == lane).map(|q| q.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_two_line_format() {
        let qs = QuerySet::parse("num_queries=3,\n17,4,230,\n", 8).unwrap();
        assert_eq!(qs, QuerySet::from_sources([17u64, 4, 230]));
        assert_eq!(qs.source_of(2), Some(VertexId(230)));
        assert_eq!(qs.source_of(3), None);
    }

    #[test]
    fn truncates_to_lane_count() {
        let qs = QuerySet::parse("num_queries=4,\n1,2,3,4,\n", 2).unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs.iter().map(|q| q.source.0).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn rejects_malformed_files() {
        assert!(matches!(QuerySet::parse("", 4), Err(Error::Config(_))));
        assert!(matches!(QuerySet::parse("1,2,3,\n", 4), Err(Error::Config(_))));
        assert!(matches!(QuerySet::parse("num_queries=1,\nx,\n", 4), Err(Error::Config(_))));
        assert!(matches!(QuerySet::parse("num_queries=0,\n", 4), Err(Error::Config(_))));
    }

    #[test]
    fn default_sources_are_one_based() {
        let qs = QuerySet::default_for(3);
        assert_eq!(qs.iter().map(|q| (q.source.0, q.lane)).collect::<Vec<_>>(), vec![(1, 0), (2, 1), (3, 2)]);
    }
}
