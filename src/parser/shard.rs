//! Streaming parser for a single shard file.
//!
//! The file is read line by line; edges are grouped by source node in
//! first-seen order. Only nodes that appear as a source within the shard
//! produce a `PerNodePartial`; pure targets are materialized later by the
//! assembler.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::error::{GraphError, Result};
use crate::numbering::NodeNumberer;
use crate::parser::{LineGrammar, LineKind};
use crate::NodeId;

/// Lines between checks of the cancel flag.
const CANCEL_CHECK_INTERVAL: usize = 64 * 1024;

/// One source node's out-edges as seen in one shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerNodePartial {
    pub node: NodeId,
    /// Targets in the order their lines appeared.
    pub out_edges: Vec<NodeId>,
    /// `max(node, out_edges...)`
    pub max_referenced_id: NodeId,
}

/// Edges grouped by source, preserving first-seen source order.
#[derive(Debug, Default)]
pub struct EdgeGroups {
    /// (source, targets) in first-seen order of the source.
    sources: Vec<(NodeId, Vec<NodeId>)>,
    /// source -> position in `sources`
    slots: HashMap<NodeId, usize>,
    /// Largest id each touched node has been associated with. Targets that
    /// never appear as a source keep their own id as the floor value.
    maxima: HashMap<NodeId, NodeId>,
    edge_count: u64,
}

impl EdgeGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `to` to `from`'s targets and update the running maxima.
    pub fn push_edge(&mut self, from: NodeId, to: NodeId) {
        let slot = match self.slots.get(&from) {
            Some(&slot) => slot,
            None => {
                let slot = self.sources.len();
                self.sources.push((from, Vec::new()));
                self.slots.insert(from, slot);
                slot
            }
        };
        self.sources[slot].1.push(to);

        let max = self.maxima.entry(from).or_insert(from);
        *max = (*max).max(to);
        self.maxima.entry(to).or_insert(to);

        self.edge_count += 1;
    }

    /// Number of distinct source nodes.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    /// Largest id touched by any edge, None if no edges were pushed.
    pub fn max_id(&self) -> Option<NodeId> {
        self.maxima.values().copied().max()
    }

    /// Running maximum for `node`, if it was touched at all.
    pub fn max_referenced(&self, node: NodeId) -> Option<NodeId> {
        self.maxima.get(&node).copied()
    }
}

impl IntoIterator for EdgeGroups {
    type Item = PerNodePartial;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter {
            sources: self.sources.into_iter(),
            maxima: self.maxima,
        }
    }
}

/// Single-pass iterator over the grouped records of one shard.
#[derive(Debug)]
pub struct IntoIter {
    sources: std::vec::IntoIter<(NodeId, Vec<NodeId>)>,
    maxima: HashMap<NodeId, NodeId>,
}

impl Iterator for IntoIter {
    type Item = PerNodePartial;

    fn next(&mut self) -> Option<PerNodePartial> {
        let (node, out_edges) = self.sources.next()?;
        let max_referenced_id = self.maxima.get(&node).copied().unwrap_or(node);
        Some(PerNodePartial {
            node,
            out_edges,
            max_referenced_id,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sources.size_hint()
    }
}

impl ExactSizeIterator for IntoIter {}

/// Result of parsing one shard.
#[derive(Debug)]
pub struct ParsedShard {
    path: PathBuf,
    groups: EdgeGroups,
}

impl ParsedShard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn groups(&self) -> &EdgeGroups {
        &self.groups
    }

    /// Split into the shard path and its record iterator.
    pub fn into_parts(self) -> (PathBuf, IntoIter) {
        (self.path, self.groups.into_iter())
    }
}

impl IntoIterator for ParsedShard {
    type Item = PerNodePartial;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        self.groups.into_iter()
    }
}

/// Parser for one shard: grammar, numberer and id conversion are borrowed
/// from the orchestrator.
pub struct ShardParser<'a, T, N: ?Sized, F> {
    path: &'a Path,
    grammar: &'a LineGrammar,
    numberer: &'a N,
    parse_id: &'a F,
    cancel: Option<&'a AtomicBool>,
    _external: std::marker::PhantomData<fn() -> T>,
}

impl<'a, T, N, F> ShardParser<'a, T, N, F>
where
    N: NodeNumberer<T> + ?Sized,
    F: Fn(&str) -> Option<T>,
{
    pub fn new(path: &'a Path, grammar: &'a LineGrammar, numberer: &'a N, parse_id: &'a F) -> Self {
        Self {
            path,
            grammar,
            numberer,
            parse_id,
            cancel: None,
            _external: std::marker::PhantomData,
        }
    }

    /// Abort with `Cancelled` once `flag` is set.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Open and stream the shard file.
    pub fn parse(&self) -> Result<ParsedShard> {
        let file = File::open(self.path).map_err(|e| GraphError::shard_io(self.path, e))?;
        self.parse_reader(BufReader::new(file))
    }

    /// Stream shard content from any buffered reader; `path` is used for
    /// error context only.
    pub fn parse_reader<R: BufRead>(&self, mut reader: R) -> Result<ParsedShard> {
        let start = Instant::now();
        tracing::info!(shard = %self.path.display(), "started reading shard");

        let mut groups = EdgeGroups::new();
        let mut buf = Vec::new();
        let mut line_number = 0usize;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| GraphError::shard_io(self.path, e))?;
            if read == 0 {
                break;
            }
            line_number += 1;

            if line_number % CANCEL_CHECK_INTERVAL == 0 && self.is_cancelled() {
                tracing::warn!(shard = %self.path.display(), line_number, "shard parse cancelled");
                return Err(GraphError::Cancelled);
            }

            let Ok(line) = std::str::from_utf8(&buf) else {
                return Err(self.malformed(line_number, &String::from_utf8_lossy(&buf)));
            };
            match self.grammar.classify(line) {
                LineKind::Comment => {}
                LineKind::Edge(edge) => {
                    let from = self.resolve(edge.from, line_number, line)?;
                    let to = self.resolve(edge.to, line_number, line)?;
                    groups.push_edge(from, to);
                }
                LineKind::Malformed => return Err(self.malformed(line_number, line)),
            }
        }

        tracing::info!(
            shard = %self.path.display(),
            edges = groups.edge_count(),
            sources = groups.source_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "finished reading shard"
        );

        Ok(ParsedShard {
            path: self.path.to_path_buf(),
            groups,
        })
    }

    fn resolve(&self, token: &str, line_number: usize, line: &str) -> Result<NodeId> {
        let external = (self.parse_id)(token).ok_or_else(|| self.malformed(line_number, line))?;
        self.numberer.external_to_internal(&external)
    }

    fn malformed(&self, line_number: usize, line: &str) -> GraphError {
        GraphError::MalformedLine {
            shard: self.path.to_path_buf(),
            line_number,
            line: line.trim().to_string(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbering::{IdentityNumberer, SequentialNumberer};
    use crate::parser::{parse_node_id, parse_string_id};

    fn parse_identity(content: &str) -> Result<ParsedShard> {
        let grammar = LineGrammar::default();
        let numberer = IdentityNumberer::new();
        ShardParser::new(Path::new("shard-0"), &grammar, &numberer, &parse_node_id)
            .parse_reader(content.as_bytes())
    }

    #[test]
    fn test_groups_by_source_in_first_seen_order() {
        let shard = parse_identity("1 3\n2 4\n4 3\n1 5\n").unwrap();
        assert_eq!(shard.groups().edge_count(), 4);
        assert_eq!(shard.groups().max_id(), Some(5));

        let records: Vec<PerNodePartial> = shard.into_iter().collect();
        assert_eq!(
            records,
            vec![
                PerNodePartial { node: 1, out_edges: vec![3, 5], max_referenced_id: 5 },
                PerNodePartial { node: 2, out_edges: vec![4], max_referenced_id: 4 },
                PerNodePartial { node: 4, out_edges: vec![3], max_referenced_id: 4 },
            ]
        );
    }

    #[test]
    fn test_max_referenced_includes_source_itself() {
        let shard = parse_identity("9 1\n9 2\n").unwrap();
        let records: Vec<_> = shard.into_iter().collect();
        assert_eq!(records[0].max_referenced_id, 9);
    }

    #[test]
    fn test_targets_get_floor_value() {
        let shard = parse_identity("1 7\n").unwrap();
        assert_eq!(shard.groups().max_referenced(7), Some(7));
        assert_eq!(shard.groups().max_referenced(1), Some(7));
        assert_eq!(shard.groups().max_referenced(3), None);
        assert_eq!(shard.groups().source_count(), 1);
    }

    #[test]
    fn test_comments_allocate_nothing() {
        let grammar = LineGrammar::default();
        let numberer = SequentialNumberer::<String>::new();
        let shard = ShardParser::new(Path::new("s"), &grammar, &numberer, &parse_string_id)
            .parse_reader("# a b\n  # c d\nx y\n".as_bytes())
            .unwrap();

        assert_eq!(shard.groups().edge_count(), 1);
        assert_eq!(numberer.len(), 2);
        assert_eq!(numberer.internal_to_external(0).unwrap(), "x");
    }

    #[test]
    fn test_parallel_edges_preserved() {
        let shard = parse_identity("1 2\n1 2\n1 2\n").unwrap();
        let records: Vec<_> = shard.into_iter().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].out_edges, vec![2, 2, 2]);
    }

    #[test]
    fn test_malformed_line_aborts() {
        for bad in ["1 3 5", "1"] {
            let content = format!("1 2\n{bad}\n3 4\n");
            let err = parse_identity(&content).unwrap_err();
            match err {
                GraphError::MalformedLine { shard, line_number, line } => {
                    assert_eq!(shard, PathBuf::from("shard-0"));
                    assert_eq!(line_number, 2);
                    assert_eq!(line, bad);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_blank_line_aborts() {
        let err = parse_identity("1 2\n\n3 4\n").unwrap_err();
        match err {
            GraphError::MalformedLine { line_number, line, .. } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_final_newline_is_not_a_blank_line() {
        let shard = parse_identity("1 2\n3 4\n").unwrap();
        assert_eq!(shard.groups().edge_count(), 2);
        let shard = parse_identity("1 2\n3 4").unwrap();
        assert_eq!(shard.groups().edge_count(), 2);
    }

    #[test]
    fn test_invalid_utf8_is_malformed_with_line_number() {
        let grammar = LineGrammar::default();
        let numberer = IdentityNumberer::new();
        let content: &[u8] = b"1 2\n3 \xff\n5 6\n";
        let err = ShardParser::new(Path::new("s"), &grammar, &numberer, &parse_node_id)
            .parse_reader(content)
            .unwrap_err();
        match err {
            GraphError::MalformedLine { shard, line_number, line } => {
                assert_eq!(shard, PathBuf::from("s"));
                assert_eq!(line_number, 2);
                assert_eq!(line, "3 \u{fffd}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_id_is_malformed() {
        let err = parse_identity("1 x\n").unwrap_err();
        assert!(matches!(err, GraphError::MalformedLine { line_number: 1, .. }), "{err}");
    }

    #[test]
    fn test_missing_file_is_shard_io() {
        let grammar = LineGrammar::default();
        let numberer = IdentityNumberer::new();
        let err = ShardParser::new(
            Path::new("/nonexistent/edgegraph/shard"),
            &grammar,
            &numberer,
            &parse_node_id,
        )
        .parse()
        .unwrap_err();
        assert!(matches!(err, GraphError::ShardIo { .. }), "{err}");
    }

    #[test]
    fn test_cancel_flag_stops_long_shard() {
        let content = "1 2\n".repeat(CANCEL_CHECK_INTERVAL + 1);
        let grammar = LineGrammar::default();
        let numberer = IdentityNumberer::new();
        let flag = AtomicBool::new(true);
        let err = ShardParser::new(Path::new("s"), &grammar, &numberer, &parse_node_id)
            .with_cancel(&flag)
            .parse_reader(content.as_bytes())
            .unwrap_err();
        assert!(matches!(err, GraphError::Cancelled));
    }

    #[test]
    fn test_empty_groups() {
        let groups = EdgeGroups::new();
        assert_eq!(groups.max_id(), None);
        assert_eq!(groups.into_iter().count(), 0);
    }
}
