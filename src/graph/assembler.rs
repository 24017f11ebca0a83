//! Reduces per-node shard records into one `ArrayBasedDirectedGraph`.
//!
//! Records are buffered as they arrive: targets are appended to one flat
//! array and each source remembers its span. The final size is only known
//! once every record has been seen, so the span table is allocated at
//! `finish()`. Ids in `[0, max_id]` without a record get an empty span.

use std::path::Path;

use crate::error::{GraphError, Result};
use crate::graph::array::{ArrayBasedDirectedGraph, Span};
use crate::graph::StoredDirection;
use crate::loader::ShardStream;
use crate::parser::{EdgeGroups, PerNodePartial};
use crate::NodeId;

/// Growable bitset of source ids that already have a record.
#[derive(Debug, Default)]
struct SourceSet {
    words: Vec<u64>,
}

impl SourceSet {
    /// Mark `id`; false if it was already marked.
    fn insert(&mut self, id: NodeId) -> bool {
        let word = id as usize / 64;
        let bit = 1u64 << (id % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }
}

/// Single-threaded reduction of `PerNodePartial` records.
#[derive(Debug)]
pub struct GraphAssembler {
    direction: StoredDirection,
    /// (source, span) per buffered record, arrival order.
    records: Vec<(NodeId, Span)>,
    targets: Vec<NodeId>,
    seen: SourceSet,
    global_max: Option<NodeId>,
}

impl GraphAssembler {
    pub fn new(direction: StoredDirection) -> Self {
        Self {
            direction,
            records: Vec::new(),
            targets: Vec::new(),
            seen: SourceSet::default(),
            global_max: None,
        }
    }

    /// Buffer one record.
    ///
    /// Fails with `DuplicateSource` if `partial.node` already has a record.
    pub fn push(&mut self, partial: PerNodePartial) -> Result<()> {
        self.push_from(partial, None)
    }

    fn push_from(&mut self, partial: PerNodePartial, shard: Option<&Path>) -> Result<()> {
        if !self.seen.insert(partial.node) {
            return Err(GraphError::DuplicateSource {
                node: partial.node,
                shard: shard.map(Path::to_path_buf),
            });
        }
        self.place(partial);
        Ok(())
    }

    /// Copy a record whose source is already marked in `seen`.
    fn place(&mut self, partial: PerNodePartial) {
        let PerNodePartial {
            node,
            out_edges,
            max_referenced_id,
        } = partial;

        let start = self.targets.len() as u64;
        let mut max = node.max(max_referenced_id);
        for &t in &out_edges {
            max = max.max(t);
        }
        self.targets.extend_from_slice(&out_edges);
        let end = self.targets.len() as u64;

        self.records.push((node, Span { start, end }));
        self.global_max = Some(self.global_max.map_or(max, |g| g.max(max)));
    }

    pub fn edge_count(&self) -> u64 {
        self.targets.len() as u64
    }

    /// Allocate `global_max + 1` spans and place every buffered record.
    pub fn finish(self) -> ArrayBasedDirectedGraph {
        let Some(global_max) = self.global_max else {
            tracing::debug!("no records, building empty graph");
            return ArrayBasedDirectedGraph::empty(self.direction);
        };

        let node_count = global_max as usize + 1;
        tracing::debug!(
            node_count,
            edge_count = self.targets.len(),
            sources = self.records.len(),
            "allocating adjacency"
        );

        // Absent ids point at an empty range.
        let mut spans = vec![Span::default(); node_count];
        for (node, span) in self.records {
            spans[node as usize] = span;
        }

        ArrayBasedDirectedGraph::from_parts(spans, self.targets, self.direction)
    }

    /// Consume any record sequence; the first error aborts assembly.
    pub fn assemble<I>(records: I, direction: StoredDirection) -> Result<ArrayBasedDirectedGraph>
    where
        I: IntoIterator<Item = Result<PerNodePartial>>,
    {
        let mut assembler = Self::new(direction);
        for record in records {
            assembler.push(record?)?;
        }
        Ok(assembler.finish())
    }

    /// Consume a shard stream, attributing duplicate sources to their shard.
    pub fn assemble_stream(
        mut stream: ShardStream,
        direction: StoredDirection,
    ) -> Result<ArrayBasedDirectedGraph> {
        let mut assembler = Self::new(direction);
        while let Some(record) = stream.next() {
            let record = record?;
            assembler.push_from(record, stream.current_shard())?;
        }
        Ok(assembler.finish())
    }

    /// Build from in-memory edges, grouped by source in first-seen order.
    pub fn from_edges<I>(edges: I, direction: StoredDirection) -> ArrayBasedDirectedGraph
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut groups = EdgeGroups::new();
        for (from, to) in edges {
            groups.push_edge(from, to);
        }

        let mut assembler = Self::new(direction);
        // Groups hold exactly one record per source.
        for record in groups {
            assembler.seen.insert(record.node);
            assembler.place(record);
        }
        assembler.finish()
    }
}
