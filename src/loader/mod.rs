//! Shard discovery and concurrent parsing.
//!
//! A graph directory holds one or more shard files. Each shard is parsed
//! independently (sequentially or on a rayon pool) and the per-node records
//! of all shards are exposed as one pull-based `ShardStream`:
//!
//! ```text
//! directory --discover--> [shard paths] --parse (N workers)--> channel
//!                                                              |
//!                       GraphAssembler <-- ShardStream <-------+
//! ```
//!
//! Within a shard, records keep their first-seen source order. Across
//! shards, order is completion order in parallel mode and path order in
//! sequential mode. The first failing shard ends the stream with its error
//! and cancels the rest.

pub mod workers;

pub use workers::Workers;

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::config::LoadConfig;
use crate::error::{GraphError, Result};
use crate::graph::{ArrayBasedDirectedGraph, GraphAssembler, StoredDirection};
use crate::numbering::NodeNumberer;
use crate::parser::shard::IntoIter;
use crate::parser::{LineGrammar, ParsedShard, PerNodePartial, ShardParser};

/// Parses one shard path, honoring the cancel flag.
type ParseFn = Arc<dyn Fn(&Path, &AtomicBool) -> Result<ParsedShard> + Send + Sync>;

/// Shard files in `directory` whose name starts with `prefix` (all files
/// when `prefix` is None), sorted by path. Subdirectories are skipped.
pub fn discover_shards(directory: &Path, prefix: Option<&str>) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(directory).map_err(|e| GraphError::shard_io(directory, e))?;

    let mut shards = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| GraphError::shard_io(directory, e))?;
        let name = entry.file_name();
        let matches = match prefix {
            Some(p) => name.to_string_lossy().starts_with(p),
            None => true,
        };
        if !matches {
            continue;
        }
        let file_type = entry
            .file_type()
            .map_err(|e| GraphError::shard_io(entry.path(), e))?;
        if file_type.is_dir() {
            continue;
        }
        shards.push(entry.path());
    }
    shards.sort();

    tracing::debug!(
        directory = %directory.display(),
        prefix = prefix.unwrap_or(""),
        shards = shards.len(),
        "discovered shards"
    );
    Ok(shards)
}

/// Reads every shard of a directory into one record stream.
///
/// `T` is the external id type; `N` the shared numberer; `F` converts a
/// token into `T` (None marks the line malformed).
pub struct ShardOrchestrator<T, N, F> {
    directory: PathBuf,
    prefix: Option<String>,
    grammar: Arc<LineGrammar>,
    numberer: Arc<N>,
    parse_id: Arc<F>,
    _external: PhantomData<fn() -> T>,
}

impl<T, N, F> ShardOrchestrator<T, N, F>
where
    T: 'static,
    N: NodeNumberer<T> + 'static,
    F: Fn(&str) -> Option<T> + Send + Sync + 'static,
{
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: Option<String>,
        numberer: Arc<N>,
        parse_id: F,
        separator: &str,
        quote: Option<char>,
    ) -> Result<Self> {
        Ok(Self {
            directory: directory.into(),
            prefix,
            grammar: Arc::new(LineGrammar::new(separator, quote)?),
            numberer,
            parse_id: Arc::new(parse_id),
            _external: PhantomData,
        })
    }

    pub fn from_config(config: &LoadConfig, numberer: Arc<N>, parse_id: F) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.directory.clone(),
            config.prefix.clone(),
            numberer,
            parse_id,
            &config.separator,
            config.quote,
        )
    }

    pub fn numberer(&self) -> &Arc<N> {
        &self.numberer
    }

    pub fn grammar(&self) -> &LineGrammar {
        &self.grammar
    }

    pub fn shards(&self) -> Result<Vec<PathBuf>> {
        discover_shards(&self.directory, self.prefix.as_deref())
    }

    /// Start parsing every shard and return the merged record stream.
    pub fn stream(&self, workers: &Workers) -> Result<ShardStream> {
        let shards = self.shards()?;
        tracing::info!(
            directory = %self.directory.display(),
            shards = shards.len(),
            workers = workers.width(),
            "reading graph shards"
        );

        let parse: ParseFn = {
            let grammar = Arc::clone(&self.grammar);
            let numberer = Arc::clone(&self.numberer);
            let parse_id = Arc::clone(&self.parse_id);
            Arc::new(move |path: &Path, cancel: &AtomicBool| {
                ShardParser::new(path, &*grammar, &*numberer, &*parse_id)
                    .with_cancel(cancel)
                    .parse()
            })
        };

        Ok(ShardStream::start(shards, parse, workers))
    }

    /// Parse every shard and assemble the graph.
    pub fn load(&self, workers: &Workers, direction: StoredDirection) -> Result<ArrayBasedDirectedGraph> {
        GraphAssembler::assemble_stream(self.stream(workers)?, direction)
    }
}

enum Source {
    Sequential {
        pending: std::vec::IntoIter<PathBuf>,
        parse: ParseFn,
    },
    Parallel {
        results: Receiver<Result<ParsedShard>>,
        remaining: usize,
    },
}

/// Lazy union of the per-node records of all shards.
///
/// Single pass; re-reading requires a new stream. Dropping the stream
/// early cancels shards that have not finished.
pub struct ShardStream {
    source: Source,
    current: Option<IntoIter>,
    current_shard: Option<PathBuf>,
    cancel: Arc<AtomicBool>,
    shard_count: usize,
    finished: bool,
}

impl ShardStream {
    fn start(shards: Vec<PathBuf>, parse: ParseFn, workers: &Workers) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let shard_count = shards.len();

        let source = match workers {
            Workers::Sequential => Source::Sequential {
                pending: shards.into_iter(),
                parse,
            },
            Workers::Pool(pool) => {
                let (tx, rx) = crossbeam_channel::unbounded();
                for path in shards {
                    let tx = tx.clone();
                    let parse = Arc::clone(&parse);
                    let cancel = Arc::clone(&cancel);
                    pool.spawn(move || {
                        let result = if cancel.load(Ordering::Relaxed) {
                            Err(GraphError::Cancelled)
                        } else {
                            parse(path.as_path(), &*cancel)
                        };
                        // Receiver is gone once the stream is dropped.
                        let _ = tx.send(result);
                    });
                }
                Source::Parallel {
                    results: rx,
                    remaining: shard_count,
                }
            }
        };

        Self {
            source,
            current: None,
            current_shard: None,
            cancel,
            shard_count,
            finished: false,
        }
    }

    /// Number of shards this stream reads.
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Shard that produced the most recently yielded record.
    pub fn current_shard(&self) -> Option<&Path> {
        self.current_shard.as_deref()
    }

    fn next_shard(&mut self) -> Option<Result<ParsedShard>> {
        match &mut self.source {
            Source::Sequential { pending, parse } => {
                let path = pending.next()?;
                Some(parse(path.as_path(), &*self.cancel))
            }
            Source::Parallel { results, remaining } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                Some(results.recv().unwrap_or_else(|_| {
                    Err(GraphError::WorkerPool("shard worker exited without a result".into()))
                }))
            }
        }
    }

    fn fail(&mut self, err: GraphError) -> Option<Result<PerNodePartial>> {
        self.cancel.store(true, Ordering::Relaxed);
        self.finished = true;
        self.current = None;
        tracing::warn!(error = %err, "graph shard read failed, cancelling remaining shards");
        Some(Err(err))
    }
}

impl Iterator for ShardStream {
    type Item = Result<PerNodePartial>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(record));
            }
            self.current = None;
            if self.finished {
                return None;
            }

            match self.next_shard() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Ok(shard)) => {
                    let (path, records) = shard.into_parts();
                    self.current_shard = Some(path);
                    self.current = Some(records);
                }
                Some(Err(err)) => return self.fail(err),
            }
        }
    }
}

impl Drop for ShardStream {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}
