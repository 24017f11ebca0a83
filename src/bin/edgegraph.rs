//! edgegraph: load a sharded edge-list directory and print graph stats.
//!
//! Run: cargo run --release --bin edgegraph -- ./shards --prefix part- --threads 8

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use edgegraph::parser::{parse_node_id, parse_string_id};
use edgegraph::{
    load_graph, ArrayBasedDirectedGraph, GraphStats, IdentityNumberer, LoadConfig,
    NodeNumberer, SequentialNumberer, StoredDirection,
};

#[derive(Parser, Debug)]
#[command(name = "edgegraph", version, about = "Build an array-based graph from sharded edge lists")]
struct Args {
    /// Directory containing shard files
    directory: Option<PathBuf>,

    /// JSON load config; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only read files whose name starts with this prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Separator between the two ids of a line
    #[arg(long)]
    separator: Option<String>,

    /// Optional quote character around ids
    #[arg(long)]
    quote: Option<char>,

    /// Parse threads (default: auto-detect)
    #[arg(long)]
    threads: Option<usize>,

    /// Also build the incoming-edge index
    #[arg(long)]
    both: bool,

    /// Treat ids as opaque strings instead of dense integers
    #[arg(long)]
    string_ids: bool,
}

#[derive(Serialize)]
struct Report {
    #[serde(flatten)]
    stats: GraphStats,
    distinct_ids: usize,
    elapsed_ms: u64,
}

fn resolve_config(args: &Args) -> anyhow::Result<LoadConfig> {
    let mut config = match (&args.config, &args.directory) {
        (Some(path), _) => LoadConfig::read_from(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        (None, Some(dir)) => LoadConfig::new(dir),
        (None, None) => anyhow::bail!("either <DIRECTORY> or --config is required"),
    };

    if let Some(dir) = &args.directory {
        config.directory = dir.clone();
    }
    if args.prefix.is_some() {
        config.prefix = args.prefix.clone();
    }
    if let Some(sep) = &args.separator {
        config.separator = sep.clone();
    }
    if args.quote.is_some() {
        config.quote = args.quote;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.both {
        config.direction = StoredDirection::Both;
    }
    config.validate()?;
    Ok(config)
}

fn load<T, N, F>(config: &LoadConfig, numberer: N, parse_id: F) -> anyhow::Result<(ArrayBasedDirectedGraph, usize)>
where
    T: 'static,
    N: NodeNumberer<T> + 'static,
    F: Fn(&str) -> Option<T> + Send + Sync + 'static,
{
    let numberer = Arc::new(numberer);
    let graph = load_graph(config, Arc::clone(&numberer), parse_id)
        .with_context(|| format!("loading graph from {}", config.directory.display()))?;
    Ok((graph, numberer.len()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    let start = Instant::now();
    let (graph, distinct_ids) = if args.string_ids {
        load(&config, SequentialNumberer::<String>::new(), parse_string_id)?
    } else {
        load(&config, IdentityNumberer::new(), parse_node_id)?
    };

    let report = Report {
        stats: graph.stats(),
        distinct_ids,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
