//! Error types for graph construction

use std::path::PathBuf;

use thiserror::Error;

use crate::NodeId;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Malformed line {line_number} in shard {}: {line:?}", .shard.display())]
    MalformedLine {
        shard: PathBuf,
        line_number: usize,
        line: String,
    },

    #[error("Cannot read shard {}: {source}", .path.display())]
    ShardIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown internal id: {0}")]
    UnknownId(NodeId),

    #[error("Node id {id} out of range (max id: {max_id:?})")]
    OutOfRange { id: NodeId, max_id: Option<NodeId> },

    #[error("Source node {node} appears in more than one shard{}", shard_suffix(.shard))]
    DuplicateSource { node: NodeId, shard: Option<PathBuf> },

    #[error("Internal id space exhausted (>{} distinct ids)", NodeId::MAX as u64 + 1)]
    IdSpaceExhausted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Graph construction cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn shard_suffix(shard: &Option<PathBuf>) -> String {
    match shard {
        Some(path) => format!(" (second seen in {})", path.display()),
        None => String::new(),
    }
}

impl GraphError {
    /// Stable error code for callers that report failures programmatically
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::MalformedLine { .. } => "MALFORMED_LINE",
            GraphError::ShardIo { .. } => "SHARD_IO",
            GraphError::UnknownId(_) => "UNKNOWN_ID",
            GraphError::OutOfRange { .. } => "OUT_OF_RANGE",
            GraphError::DuplicateSource { .. } => "DUPLICATE_SOURCE_SHARD",
            GraphError::IdSpaceExhausted => "ID_SPACE_EXHAUSTED",
            GraphError::InvalidConfig(_) => "INVALID_CONFIG",
            GraphError::Cancelled => "CANCELLED",
            _ => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn shard_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::ShardIo {
            path: path.into(),
            source,
        }
    }
}
