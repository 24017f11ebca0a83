//! Lock-protected numberer for arbitrary hashable external ids.
//!
//! Ids are handed out in first-seen order. Reads take the shared lock and
//! only a miss escalates to the exclusive lock, where the lookup is repeated
//! before allocating so a racing writer cannot cause a double allocation.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use crate::error::{GraphError, Result};
use crate::numbering::NodeNumberer;
use crate::NodeId;

#[derive(Debug)]
struct Table<T> {
    /// external -> internal
    index: HashMap<T, NodeId>,
    /// internal -> external, indexed by internal id
    externals: Vec<T>,
}

/// Dense first-seen numbering for any `Eq + Hash + Clone` external id.
#[derive(Debug)]
pub struct SequentialNumberer<T> {
    table: RwLock<Table<T>>,
}

impl<T> SequentialNumberer<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size both directions for roughly `capacity` distinct ids.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: RwLock::new(Table {
                index: HashMap::with_capacity(capacity),
                externals: Vec::with_capacity(capacity),
            }),
        }
    }
}

impl<T> Default for SequentialNumberer<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeNumberer<T> for SequentialNumberer<T>
where
    T: Eq + Hash + Clone + Send + Sync,
{
    fn external_to_internal(&self, external: &T) -> Result<NodeId> {
        {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = table.index.get(external) {
                return Ok(id);
            }
        }

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&id) = table.index.get(external) {
            return Ok(id);
        }

        let id = NodeId::try_from(table.externals.len()).map_err(|_| GraphError::IdSpaceExhausted)?;
        table.externals.push(external.clone());
        table.index.insert(external.clone(), id);
        Ok(id)
    }

    fn internal_to_external(&self, internal: NodeId) -> Result<T> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .externals
            .get(internal as usize)
            .cloned()
            .ok_or(GraphError::UnknownId(internal))
    }

    fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .externals
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ids_assigned_in_first_seen_order() {
        let numberer = SequentialNumberer::<String>::new();
        assert!(numberer.is_empty());

        assert_eq!(numberer.external_to_internal(&"alice".to_string()).unwrap(), 0);
        assert_eq!(numberer.external_to_internal(&"bob".to_string()).unwrap(), 1);
        assert_eq!(numberer.external_to_internal(&"alice".to_string()).unwrap(), 0);
        assert_eq!(numberer.external_to_internal(&"carol".to_string()).unwrap(), 2);
        assert_eq!(numberer.len(), 3);
    }

    #[test]
    fn test_reverse_lookup() {
        let numberer = SequentialNumberer::new();
        for e in [40u64, 10, 40, 30] {
            numberer.external_to_internal(&e).unwrap();
        }
        assert_eq!(numberer.internal_to_external(0).unwrap(), 40);
        assert_eq!(numberer.internal_to_external(1).unwrap(), 10);
        assert_eq!(numberer.internal_to_external(2).unwrap(), 30);
    }

    #[test]
    fn test_unknown_internal_id() {
        let numberer = SequentialNumberer::<u64>::new();
        numberer.external_to_internal(&5).unwrap();
        let err = numberer.internal_to_external(1).unwrap_err();
        assert!(matches!(err, GraphError::UnknownId(1)), "unexpected error: {err}");
    }

    #[test]
    fn test_concurrent_first_sightings_agree() {
        let numberer = Arc::new(SequentialNumberer::<u64>::new());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let numberer = Arc::clone(&numberer);
                std::thread::spawn(move || {
                    // Every thread walks the same keys in a different order.
                    (0..1_000u64)
                        .map(|i| {
                            let key = (i * 7 + t * 131) % 1_000;
                            (key, numberer.external_to_internal(&key).unwrap())
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: HashMap<u64, NodeId> = HashMap::new();
        for handle in threads {
            for (key, id) in handle.join().unwrap() {
                let prev = *seen.entry(key).or_insert(id);
                assert_eq!(prev, id, "key {key} received two internal ids");
            }
        }

        assert_eq!(numberer.len(), 1_000);
        let mut ids: Vec<NodeId> = seen.values().copied().collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..1_000).collect::<Vec<NodeId>>());
    }
}
