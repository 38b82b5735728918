//! The in-memory record tracking one active automount.

use std::fmt;
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};

use super::expiry::ExpiryTask;

/// Identifier of the storage pool owning a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolId(pub u64);

/// Opaque handle to the root of a mounted snapshot filesystem, handed back
/// to the namespace layer when it builds directory responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountHandle(pub u64);

/// One currently-automounted snapshot.
///
/// Entries are shared as `Arc<SnapEntry>`: the registry holds one clone for
/// as long as the entry is registered, every `find_by_*` lookup hands out a
/// clone, and a pending expiry task holds one until it fires or is
/// canceled. The entry is freed when the last clone drops.
pub struct SnapEntry {
    /// Full `dataset@snapshot` name. Only the registry rename path mutates
    /// this, under the registry write lock.
    name: RwLock<String>,
    /// Absolute path where the snapshot is mounted. A rename does not move
    /// the mount, so this never changes.
    pub mount_path: PathBuf,
    /// Owning pool.
    pub pool_id: PoolId,
    /// Identifier unique within the pool, stable for the snapshot's
    /// lifetime.
    pub dataset_id: u64,
    /// Root of the mounted filesystem.
    pub mount_handle: MountHandle,
    /// Pending delayed-expiry task, if any. Guarded separately from the
    /// registry lock so task bookkeeping never stalls registry lookups.
    pub(crate) task: Mutex<Option<ExpiryTask>>,
}

impl SnapEntry {
    /// Creates an entry for a freshly mounted snapshot.
    pub fn new(
        name: &str,
        mount_path: PathBuf,
        pool_id: PoolId,
        dataset_id: u64,
        mount_handle: MountHandle,
    ) -> Self {
        Self {
            name: RwLock::new(name.to_string()),
            mount_path,
            pool_id,
            dataset_id,
            mount_handle,
            task: Mutex::new(None),
        }
    }

    /// Full `dataset@snapshot` name.
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub(crate) fn set_name(&self, new_name: &str) {
        *self.name.write() = new_name.to_string();
    }
}

impl fmt::Debug for SnapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapEntry")
            .field("name", &self.name())
            .field("mount_path", &self.mount_path)
            .field("pool_id", &self.pool_id)
            .field("dataset_id", &self.dataset_id)
            .field("mount_handle", &self.mount_handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_starts_without_task() {
        let entry = SnapEntry::new(
            "pool/fs@s1",
            PathBuf::from("/.zfs/snapshot/s1"),
            PoolId(1),
            42,
            MountHandle(7),
        );

        assert_eq!(entry.name(), "pool/fs@s1");
        assert!(entry.task.lock().is_none());
    }

    #[test]
    fn test_set_name_keeps_identity() {
        let entry = SnapEntry::new(
            "pool/fs@old",
            PathBuf::from("/.zfs/snapshot/old"),
            PoolId(1),
            42,
            MountHandle(7),
        );

        entry.set_name("pool/fs@new");
        assert_eq!(entry.name(), "pool/fs@new");
        assert_eq!(entry.dataset_id, 42);
        assert_eq!(entry.mount_path, PathBuf::from("/.zfs/snapshot/old"));
    }
}
