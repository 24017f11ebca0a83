//! Immutable array-based directed graph.
//!
//! Layout:
//! ```text
//! spans:   [Span; max_id + 1]     // [start, end) into targets, per node
//! targets: [NodeId; edge_count]   // out-edges, grouped per source
//!
//! incoming (StoredDirection::Both only, CSR):
//! offsets: [u64; max_id + 2]
//! sources: [NodeId; edge_count]   // sources[offsets[i]..offsets[i+1]] point at i
//! ```

use crate::error::{GraphError, Result};
use crate::graph::{DirectedGraph, GraphStats, StoredDirection};
use crate::NodeId;

/// `[start, end)` range of one node's out-edges in `targets`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    fn len(&self) -> usize {
        (self.end - self.start) as usize
    }
}

/// Reverse adjacency in CSR form.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Incoming {
    offsets: Vec<u64>,
    sources: Vec<NodeId>,
}

impl Incoming {
    /// Counting pass over out-edges in ascending source order.
    fn build(spans: &[Span], targets: &[NodeId]) -> Self {
        let mut offsets = vec![0u64; spans.len() + 1];
        for &t in targets {
            offsets[t as usize + 1] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        let mut cursor: Vec<u64> = offsets[..spans.len()].to_vec();
        let mut sources = vec![0 as NodeId; targets.len()];
        for (src, span) in spans.iter().enumerate() {
            for &t in &targets[span.start as usize..span.end as usize] {
                let slot = &mut cursor[t as usize];
                sources[*slot as usize] = src as NodeId;
                *slot += 1;
            }
        }

        Self { offsets, sources }
    }
}

/// Out-edges for every id in `[0, max_id]` with O(1) lookup by id.
///
/// Built by `GraphAssembler`; there are no mutation operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBasedDirectedGraph {
    spans: Vec<Span>,
    targets: Vec<NodeId>,
    incoming: Option<Incoming>,
}

impl ArrayBasedDirectedGraph {
    /// Caller guarantees every target id is `< spans.len()`.
    pub(crate) fn from_parts(spans: Vec<Span>, targets: Vec<NodeId>, direction: StoredDirection) -> Self {
        debug_assert!(targets.iter().all(|&t| (t as usize) < spans.len()));
        let incoming = direction
            .stores_incoming()
            .then(|| Incoming::build(&spans, &targets));
        Self {
            spans,
            targets,
            incoming,
        }
    }

    /// The empty graph (`max_id() == None`).
    pub fn empty(direction: StoredDirection) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), direction)
    }

    pub fn direction(&self) -> StoredDirection {
        if self.incoming.is_some() {
            StoredDirection::Both
        } else {
            StoredDirection::Out
        }
    }

    fn span(&self, id: NodeId) -> Result<Span> {
        self.spans
            .get(id as usize)
            .copied()
            .ok_or(GraphError::OutOfRange {
                id,
                max_id: self.max_id(),
            })
    }

    fn incoming(&self) -> Result<&Incoming> {
        self.incoming.as_ref().ok_or_else(|| {
            GraphError::InvalidConfig("graph was built without incoming edges".into())
        })
    }

    /// Nodes with an edge into `id`, ascending by source.
    pub fn in_neighbors(&self, id: NodeId) -> Result<&[NodeId]> {
        let incoming = self.incoming()?;
        self.span(id)?;
        let start = incoming.offsets[id as usize] as usize;
        let end = incoming.offsets[id as usize + 1] as usize;
        Ok(&incoming.sources[start..end])
    }

    pub fn in_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.in_neighbors(id)?.len())
    }

    /// All nodes in id order with their out-neighbors.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &[NodeId])> + '_ {
        self.spans.iter().enumerate().map(move |(id, span)| {
            (id as NodeId, &self.targets[span.start as usize..span.end as usize])
        })
    }

    pub fn stats(&self) -> GraphStats {
        let mut max_out_degree = 0;
        let mut sink_count = 0;
        for span in &self.spans {
            let degree = span.len();
            max_out_degree = max_out_degree.max(degree);
            if degree == 0 {
                sink_count += 1;
            }
        }
        GraphStats {
            node_count: self.spans.len(),
            edge_count: self.targets.len() as u64,
            max_out_degree,
            sink_count,
        }
    }
}

impl DirectedGraph for ArrayBasedDirectedGraph {
    fn max_id(&self) -> Option<NodeId> {
        self.spans.len().checked_sub(1).map(|max| max as NodeId)
    }

    fn neighbors(&self, id: NodeId) -> Result<&[NodeId]> {
        let span = self.span(id)?;
        Ok(&self.targets[span.start as usize..span.end as usize])
    }

    fn out_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.span(id)?.len())
    }

    fn node_count(&self) -> usize {
        self.spans.len()
    }

    fn edge_count(&self) -> u64 {
        self.targets.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0 -> [1, 2], 1 -> [], 2 -> [0, 2]
    fn sample(direction: StoredDirection) -> ArrayBasedDirectedGraph {
        let spans = vec![
            Span { start: 0, end: 2 },
            Span { start: 2, end: 2 },
            Span { start: 2, end: 4 },
        ];
        ArrayBasedDirectedGraph::from_parts(spans, vec![1, 2, 0, 2], direction)
    }

    #[test]
    fn test_neighbors_and_degrees() {
        let g = sample(StoredDirection::Out);
        assert_eq!(g.max_id(), Some(2));
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.neighbors(0).unwrap(), &[1, 2]);
        assert_eq!(g.neighbors(1).unwrap(), &[] as &[NodeId]);
        assert_eq!(g.out_degree(2).unwrap(), 2);
        assert!(g.contains(2));
        assert!(!g.contains(3));
    }

    #[test]
    fn test_out_of_range() {
        let g = sample(StoredDirection::Out);
        let err = g.neighbors(3).unwrap_err();
        assert!(
            matches!(err, GraphError::OutOfRange { id: 3, max_id: Some(2) }),
            "unexpected error: {err}"
        );
        assert!(g.out_degree(NodeId::MAX).is_err());
    }

    #[test]
    fn test_empty_graph() {
        let g = ArrayBasedDirectedGraph::empty(StoredDirection::Out);
        assert_eq!(g.max_id(), None);
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(matches!(
            g.neighbors(0),
            Err(GraphError::OutOfRange { id: 0, max_id: None })
        ));
        assert_eq!(g.stats(), GraphStats::default());
    }

    #[test]
    fn test_incoming_edges() {
        let g = sample(StoredDirection::Both);
        assert_eq!(g.direction(), StoredDirection::Both);
        assert_eq!(g.in_neighbors(0).unwrap(), &[2]);
        assert_eq!(g.in_neighbors(1).unwrap(), &[0]);
        assert_eq!(g.in_neighbors(2).unwrap(), &[0, 2]);
        assert_eq!(g.in_degree(2).unwrap(), 2);
        assert!(matches!(g.in_neighbors(3), Err(GraphError::OutOfRange { .. })));
    }

    #[test]
    fn test_incoming_requires_both_direction() {
        let g = sample(StoredDirection::Out);
        assert!(matches!(g.in_neighbors(0), Err(GraphError::InvalidConfig(_))));
    }

    #[test]
    fn test_nodes_and_stats() {
        let g = sample(StoredDirection::Out);
        let nodes: Vec<(NodeId, Vec<NodeId>)> = g.nodes().map(|(id, n)| (id, n.to_vec())).collect();
        assert_eq!(nodes, vec![(0, vec![1, 2]), (1, vec![]), (2, vec![0, 2])]);

        let stats = g.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 4);
        assert_eq!(stats.max_out_degree, 2);
        assert_eq!(stats.sink_count, 1);
    }
}
