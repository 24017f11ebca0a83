//! edgegraph - array-based directed graphs built from sharded edge lists
//!
//! Text shards of `from to` lines are parsed in parallel, node ids are
//! renumbered into a dense range by a shared `NodeNumberer`, and the
//! per-node records of all shards are assembled into one immutable
//! `ArrayBasedDirectedGraph` with O(1) neighbor lookup.
//!
//! ```no_run
//! use std::sync::Arc;
//! use edgegraph::{DirectedGraph, IdentityNumberer, ShardOrchestrator, StoredDirection, Workers};
//! use edgegraph::parser::parse_node_id;
//!
//! let orchestrator = ShardOrchestrator::new(
//!     "/data/graph",
//!     Some("part-".to_string()),
//!     Arc::new(IdentityNumberer::new()),
//!     parse_node_id,
//!     " ",
//!     None,
//! )?;
//! let graph = orchestrator.load(&Workers::with_threads(4)?, StoredDirection::Out)?;
//! println!("{} nodes, {} edges", graph.node_count(), graph.edge_count());
//! # Ok::<(), edgegraph::GraphError>(())
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod numbering;
pub mod parser;
pub mod resource;

/// Dense internal node id.
pub type NodeId = u32;

pub use config::LoadConfig;
pub use error::{GraphError, Result};
pub use graph::{ArrayBasedDirectedGraph, DirectedGraph, GraphAssembler, GraphStats, StoredDirection};
pub use loader::{discover_shards, ShardOrchestrator, ShardStream, Workers};
pub use numbering::{IdentityNumberer, NodeNumberer, SequentialNumberer};
pub use parser::{LineGrammar, PerNodePartial, ShardParser};

use std::sync::Arc;

/// Build a graph from `config` with the given numberer and id parser.
///
/// Uses `config.threads` workers, or an auto-tuned pool when unset.
pub fn load_graph<T, N, F>(config: &LoadConfig, numberer: Arc<N>, parse_id: F) -> Result<ArrayBasedDirectedGraph>
where
    T: 'static,
    N: NodeNumberer<T> + 'static,
    F: Fn(&str) -> Option<T> + Send + Sync + 'static,
{
    let workers = match config.threads {
        Some(threads) => Workers::with_threads(threads)?,
        None => Workers::auto()?,
    };
    ShardOrchestrator::from_config(config, numberer, parse_id)?.load(&workers, config.direction)
}
