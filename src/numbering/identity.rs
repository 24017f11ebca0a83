//! Identity numbering for inputs that are already dense integers.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GraphError, Result};
use crate::numbering::NodeNumberer;
use crate::NodeId;

/// Maps every id to itself and remembers only the highest id seen.
///
/// `len()` is `highest + 1`, so the allocated range stays `0..len()` even
/// when the input skips some ids.
#[derive(Debug, Default)]
pub struct IdentityNumberer {
    /// Highest id seen plus one; 0 while nothing has been seen.
    bound: AtomicU64,
}

impl IdentityNumberer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeNumberer<NodeId> for IdentityNumberer {
    fn external_to_internal(&self, external: &NodeId) -> Result<NodeId> {
        self.bound.fetch_max(*external as u64 + 1, Ordering::AcqRel);
        Ok(*external)
    }

    fn internal_to_external(&self, internal: NodeId) -> Result<NodeId> {
        if (internal as u64) < self.bound.load(Ordering::Acquire) {
            Ok(internal)
        } else {
            Err(GraphError::UnknownId(internal))
        }
    }

    fn len(&self) -> usize {
        self.bound.load(Ordering::Acquire) as usize
    }
}
