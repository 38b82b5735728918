//! Test doubles for the helper and store seams.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use super::config::MountConfig;
use super::entry::{MountHandle, PoolId};
use super::error::{Result, SnapMountError};
use super::helper::MountHelper;
use super::manager::MountManager;
use super::store::{SnapshotInfo, SnapshotStore};

/// Scriptable mount helper recording every invocation.
#[derive(Default)]
pub struct MockHelper {
    mounts: AtomicUsize,
    unmounts: AtomicUsize,
    fail_mount_busy: AtomicUsize,
    /// Results returned by upcoming unmount calls, oldest first; when
    /// empty, unmount succeeds.
    pub unmount_script: Mutex<VecDeque<Result<()>>>,
    unmount_delay: Mutex<Duration>,
    next_handle: AtomicU64,
}

impl MockHelper {
    /// Creates a helper that succeeds at everything until scripted.
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(100),
            ..Default::default()
        }
    }

    /// Number of mount invocations so far.
    pub fn mount_calls(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    /// Number of unmount invocations so far.
    pub fn unmount_calls(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }

    /// Makes the next mount call report BUSY.
    pub fn fail_next_mount_busy(&self) {
        self.fail_mount_busy.fetch_add(1, Ordering::SeqCst);
    }

    /// Queues a result for the next unmount call.
    pub fn push_unmount_result(&self, result: Result<()>) {
        self.unmount_script.lock().push_back(result);
    }

    /// Makes every unmount call block for `delay` before returning.
    pub fn set_unmount_delay(&self, delay: Duration) {
        *self.unmount_delay.lock() = delay;
    }
}

impl MountHelper for MockHelper {
    fn mount(&self, _full_name: &str, mount_path: &Path, _no_setuid: bool) -> Result<MountHandle> {
        self.mounts.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_mount_busy
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SnapMountError::Busy {
                path: mount_path.to_path_buf(),
            });
        }
        Ok(MountHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    fn unmount(&self, _mount_path: &Path, _force: bool) -> Result<()> {
        let delay = *self.unmount_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.unmounts.fetch_add(1, Ordering::SeqCst);
        self.unmount_script.lock().pop_front().unwrap_or(Ok(()))
    }
}

/// In-memory store handing out sequential dataset identifiers and
/// recording administrative calls.
#[derive(Default)]
pub struct MockStore {
    next_id: AtomicU64,
    /// Recorded `(old, new)` rename calls.
    pub renames: Mutex<Vec<(String, String)>>,
    /// Recorded created snapshot names.
    pub created: Mutex<Vec<String>>,
    /// Recorded destroyed snapshot names.
    pub destroyed: Mutex<Vec<String>>,
}

impl SnapshotStore for MockStore {
    fn resolve(&self, _full_name: &str) -> Result<SnapshotInfo> {
        Ok(SnapshotInfo {
            pool_id: PoolId(1),
            dataset_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            created: SystemTime::now(),
        })
    }

    fn rename_snapshot(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.renames
            .lock()
            .push((old_name.to_string(), new_name.to_string()));
        Ok(())
    }

    fn create_snapshot(&self, dataset: &str, component: &str) -> Result<()> {
        self.created.lock().push(format!("{dataset}@{component}"));
        Ok(())
    }

    fn destroy_snapshot(&self, full_name: &str) -> Result<()> {
        self.destroyed.lock().push(full_name.to_string());
        Ok(())
    }
}

/// Builds a manager over a mock store with the given expiry delay.
pub fn manager_with(expire_after: Duration, helper: Arc<MockHelper>) -> MountManager {
    manager_with_store(expire_after, helper, Arc::new(MockStore::default()), true)
}

/// Builds a manager with explicit store and admin settings.
pub fn manager_with_store(
    expire_after: Duration,
    helper: Arc<MockHelper>,
    store: Arc<MockStore>,
    admin_enabled: bool,
) -> MountManager {
    let config = MountConfig {
        expire_after,
        admin_enabled,
        no_setuid: false,
        snapshot_root: PathBuf::from("/.zfs/snapshot"),
    };
    MountManager::new(config, store, helper)
}
