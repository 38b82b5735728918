//! Dual-index registry of active automounts.
//!
//! Every automounted snapshot is tracked by a single [`SnapEntry`] that is
//! indexed twice: by full name and by `(pool, dataset)` identifier. Both
//! indices live behind one read-write lock, so an entry is always visible
//! in both indices or in neither. Critical sections are short and perform
//! no I/O; the external mount helper is never invoked with this lock held.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::entry::{PoolId, SnapEntry};
use super::error::{Result, SnapMountError};

#[derive(Default)]
struct Indices {
    by_name: BTreeMap<String, Arc<SnapEntry>>,
    by_dataset: BTreeMap<(PoolId, u64), Arc<SnapEntry>>,
}

/// Registry of all currently automounted snapshots.
#[derive(Default)]
pub struct SnapshotRegistry {
    indices: RwLock<Indices>,
}

impl SnapshotRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry to both indices, taking a reference on behalf of
    /// registry membership.
    ///
    /// Callers serialize automounts, so a duplicate name or identifier is
    /// an invariant violation and panics rather than returning an error.
    pub fn insert(&self, entry: Arc<SnapEntry>) {
        let mut idx = self.indices.write();
        let name = entry.name();
        let key = (entry.pool_id, entry.dataset_id);

        let prev = idx.by_name.insert(name.clone(), entry.clone());
        assert!(prev.is_none(), "duplicate automount entry for {name}");
        let prev = idx.by_dataset.insert(key, entry);
        assert!(prev.is_none(), "duplicate dataset index for {name}");
    }

    /// Removes `entry` from both indices if it is still registered,
    /// dropping the registry's reference. Returns false when another
    /// remover got there first.
    ///
    /// An explicit unmount and a firing expiry callback can both see a
    /// successful helper status for the same entry; whichever loses the
    /// race must find the entry gone and back off. Only index
    /// disagreement, an entry present in one index but not the other,
    /// remains a fatal invariant violation.
    pub fn remove_if_registered(&self, entry: &Arc<SnapEntry>) -> bool {
        let mut idx = self.indices.write();
        let name = entry.name();

        match idx.by_name.get(&name) {
            Some(current) if Arc::ptr_eq(current, entry) => {}
            _ => return false,
        }
        idx.by_name.remove(&name);
        let removed = idx.by_dataset.remove(&(entry.pool_id, entry.dataset_id));
        assert!(removed.is_some(), "dataset index missing for {name}");
        true
    }

    /// Looks up an entry by full snapshot name.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<SnapEntry>> {
        self.indices.read().by_name.get(name).cloned()
    }

    /// Looks up an entry by its pool and dataset identifier.
    pub fn find_by_dataset(&self, pool_id: PoolId, dataset_id: u64) -> Option<Arc<SnapEntry>> {
        self.indices
            .read()
            .by_dataset
            .get(&(pool_id, dataset_id))
            .cloned()
    }

    /// Re-keys an entry under a new name.
    ///
    /// The dataset index is untouched since the snapshot's identity does
    /// not change. Atomic with respect to concurrent finders: they observe
    /// either the old name or the new one, never neither.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut idx = self.indices.write();

        let entry = idx
            .by_name
            .remove(old_name)
            .ok_or_else(|| SnapMountError::NotFound(old_name.to_string()))?;
        entry.set_name(new_name);
        let prev = idx.by_name.insert(new_name.to_string(), entry);
        assert!(prev.is_none(), "rename target {new_name} already registered");

        Ok(())
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.indices.read().by_name.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones of every registered entry, ordered by name.
    pub fn entries(&self) -> Vec<Arc<SnapEntry>> {
        self.indices.read().by_name.values().cloned().collect()
    }
}
