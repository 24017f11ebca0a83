//! External-to-internal node id renumbering.
//!
//! Every shard parser resolves both endpoints of an edge through one shared
//! `NodeNumberer`. Internal ids are dense: after `n` distinct external ids
//! have been presented, the allocated ids are exactly `0..n`.

pub mod identity;
pub mod sequential;

pub use identity::IdentityNumberer;
pub use sequential::SequentialNumberer;

use crate::error::Result;
use crate::NodeId;

/// Bidirectional mapping between external ids of type `T` and internal ids.
///
/// Send + Sync required: one instance is shared by all shard-parsing workers.
pub trait NodeNumberer<T>: Send + Sync {
    /// Internal id for `external`, allocating the next dense id on first sight.
    ///
    /// Lookup-or-allocate is atomic: two concurrent first sightings of the
    /// same external id observe the same internal id.
    fn external_to_internal(&self, external: &T) -> Result<NodeId>;

    /// External id originally mapped to `internal`.
    ///
    /// Fails with `UnknownId` if `internal` was never allocated.
    fn internal_to_external(&self, internal: NodeId) -> Result<T>;

    /// Number of internal ids allocated so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
