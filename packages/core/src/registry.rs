//! Dispatch registry built from the linked catalog.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::op::OpLogic;

/// Op name -> logic, restricted to the set the agent advertises.
///
/// The map is immutable after construction; dispatch is read-only and safe
/// to share across worker tasks.
pub struct OpRegistry {
    ops: BTreeMap<String, Arc<dyn OpLogic>>,
}

impl OpRegistry {
    /// Index a list of ops by name. Later duplicates replace earlier ones.
    pub fn from_ops(ops: Vec<Arc<dyn OpLogic>>) -> Self {
        let mut map = BTreeMap::new();
        for op in ops {
            let meta = op.get_op();
            if map.insert(meta.name.clone(), op).is_some() {
                tracing::warn!(op = %meta.name, "duplicate op registration, keeping the later one");
            }
        }
        Self { ops: map }
    }

    /// Restrict the registry to `enabled` names. `None` keeps everything.
    ///
    /// Names in `enabled` that are not in the catalog are reported so a
    /// typo in `TASKS` is visible at startup rather than at dispatch time.
    pub fn restrict(self, enabled: Option<&HashSet<String>>) -> Self {
        let enabled = match enabled {
            Some(set) => set,
            None => return self,
        };
        for name in enabled {
            if !self.ops.contains_key(name) {
                tracing::warn!(op = %name, "enabled op is not in the catalog");
            }
        }
        let ops = self
            .ops
            .into_iter()
            .filter(|(name, _)| enabled.contains(name))
            .collect();
        Self { ops }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn OpLogic>> {
        self.ops.get(name)
    }

    /// Sorted op names, used for capability reporting.
    pub fn names(&self) -> Vec<String> {
        self.ops.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
