//! Array-based graph storage and assembly

pub mod array;
pub mod assembler;

pub use array::ArrayBasedDirectedGraph;
pub use assembler::GraphAssembler;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::NodeId;

/// Which adjacency directions a graph materializes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredDirection {
    /// Outgoing edges only
    #[default]
    Out,
    /// Outgoing edges plus a reverse (incoming) index
    Both,
}

impl StoredDirection {
    pub fn stores_incoming(&self) -> bool {
        matches!(self, StoredDirection::Both)
    }
}

/// Read-only view consumed by graph algorithms.
///
/// Valid ids are `0..=max_id()`; every id in that range has a (possibly
/// empty) neighbor list.
pub trait DirectedGraph {
    /// Highest internal id, None for an empty graph.
    fn max_id(&self) -> Option<NodeId>;

    /// Outgoing neighbors of `id` in input order.
    fn neighbors(&self, id: NodeId) -> Result<&[NodeId]>;

    fn out_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.neighbors(id)?.len())
    }

    /// `max_id() + 1`, or 0 when empty.
    fn node_count(&self) -> usize {
        self.max_id().map_or(0, |max| max as usize + 1)
    }

    fn edge_count(&self) -> u64;

    fn contains(&self, id: NodeId) -> bool {
        self.max_id().map_or(false, |max| id <= max)
    }
}

/// Summary counters for a built graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: u64,
    pub max_out_degree: usize,
    /// Nodes with no outgoing edges
    pub sink_count: usize,
}
