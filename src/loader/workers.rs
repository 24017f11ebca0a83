//! Worker pool used for shard parsing.

use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::resource::ResourceManager;

/// Where shard parses run.
///
/// `Sequential` parses each shard lazily on the consuming thread, one at a
/// time. `Pool` dispatches one task per shard onto a rayon pool.
#[derive(Clone)]
pub enum Workers {
    Sequential,
    Pool(Arc<rayon::ThreadPool>),
}

impl Workers {
    /// Build a pool of `threads` workers; 0 or 1 means sequential.
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads <= 1 {
            return Ok(Workers::Sequential);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("edgegraph-shard-{i}"))
            .build()
            .map_err(|e| GraphError::WorkerPool(format!("rayon pool: {e}")))?;
        Ok(Workers::Pool(Arc::new(pool)))
    }

    /// Size the pool from detected host resources.
    pub fn auto() -> Result<Self> {
        Self::with_threads(ResourceManager::auto_tune().parse_threads)
    }

    /// Number of shards that may be parsed at the same time.
    pub fn width(&self) -> usize {
        match self {
            Workers::Sequential => 1,
            Workers::Pool(pool) => pool.current_num_threads(),
        }
    }
}

impl std::fmt::Debug for Workers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Workers::Sequential => f.write_str("Workers::Sequential"),
            Workers::Pool(pool) => write!(f, "Workers::Pool({})", pool.current_num_threads()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_thread_is_sequential() {
        assert!(matches!(Workers::with_threads(0).unwrap(), Workers::Sequential));
        assert!(matches!(Workers::with_threads(1).unwrap(), Workers::Sequential));
        assert_eq!(Workers::Sequential.width(), 1);
    }

    #[test]
    fn test_pool_width() {
        let workers = Workers::with_threads(3).unwrap();
        assert_eq!(workers.width(), 3);
        assert_eq!(format!("{workers:?}"), "Workers::Pool(3)");
    }

    #[test]
    fn test_auto_has_at_least_one_worker() {
        assert!(Workers::auto().unwrap().width() >= 1);
    }
}
