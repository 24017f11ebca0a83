//! Host resource detection for sizing the shard-parsing pool.
//!
//! Stateless: each call to `ResourceManager::auto_tune()` re-probes the
//! system.

use sysinfo::System;

const GB: u64 = 1024 * 1024 * 1024;

/// Parse-thread ceiling. Parsing is I/O and numberer bound well before this.
const MAX_PARSE_THREADS: usize = 16;

/// Below this much free RAM (as a share of total) shards are parsed one at a
/// time, since every in-flight shard buffers its whole edge grouping.
const MIN_FREE_SHARE: f64 = 0.1;

/// Hardware the parse pool is sized against.
#[derive(Debug, Clone)]
pub struct SystemResources {
    pub total_memory_bytes: u64,
    pub available_memory_bytes: u64,
    pub cpu_count: usize,
}

impl SystemResources {
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        Self {
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
            cpu_count: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    /// True when there is too little RAM to hold several shards at once.
    fn memory_constrained(&self) -> bool {
        if self.total_memory_bytes < 2 * GB {
            return true;
        }
        (self.available_memory_bytes as f64) < self.total_memory_bytes as f64 * MIN_FREE_SHARE
    }
}

/// Parameters derived from system resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningProfile {
    /// Number of shards parsed concurrently.
    pub parse_threads: usize,
}

impl TuningProfile {
    pub fn from_resources(res: &SystemResources) -> Self {
        let parse_threads = if res.memory_constrained() {
            1
        } else {
            res.cpu_count.clamp(1, MAX_PARSE_THREADS)
        };
        Self { parse_threads }
    }
}

impl Default for TuningProfile {
    fn default() -> Self {
        Self { parse_threads: 1 }
    }
}

pub struct ResourceManager;

impl ResourceManager {
    pub fn auto_tune() -> TuningProfile {
        let resources = SystemResources::detect();
        let profile = TuningProfile::from_resources(&resources);
        tracing::debug!(
            cpus = resources.cpu_count,
            total_memory_bytes = resources.total_memory_bytes,
            available_memory_bytes = resources.available_memory_bytes,
            parse_threads = profile.parse_threads,
            "auto-tuned parse pool"
        );
        profile
    }
}
