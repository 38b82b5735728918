//! Mount/unmount orchestration for snapshot automounts.
//!
//! [`MountManager`] ties the registry, the expiry scheduler and the
//! external seams together. A lookup in the virtual snapshot directory
//! calls [`MountManager::ensure_mounted`]; expiry calls back into the
//! unmount path; the namespace layer queries [`MountManager::is_active`]
//! and [`MountManager::get_entry_for_dataset`] while building directory
//! responses.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use parking_lot::Mutex;
use serde::Serialize;

use super::config::MountConfig;
use super::entry::{PoolId, SnapEntry};
use super::error::{Result, SnapMountError};
use super::expiry;
use super::helper::MountHelper;
use super::registry::SnapshotRegistry;
use super::store::{self, SnapshotStore};

/// Shared state behind the orchestrator: the registry, configuration and
/// the external seams. Expiry workers keep it alive through an `Arc`.
pub(crate) struct MountCore {
    pub(crate) config: MountConfig,
    pub(crate) registry: SnapshotRegistry,
    pub(crate) store: Arc<dyn SnapshotStore>,
    pub(crate) helper: Arc<dyn MountHelper>,
    /// Serializes slow-path automounts so racing callers produce exactly
    /// one helper invocation per snapshot.
    automount_lock: Mutex<()>,
}

impl MountCore {
    /// Unmount attempt made by the expiry callback. Removes the entry from
    /// the registry on success and leaves it registered otherwise. An
    /// explicit unmount may have dropped the entry while the helper ran;
    /// that remover already did the bookkeeping.
    pub(crate) fn expire_unmount(&self, entry: &Arc<SnapEntry>) -> Result<()> {
        self.helper.unmount(&entry.mount_path, false)?;
        info!("unmounted expired snapshot {}", entry.name());
        if !self.registry.remove_if_registered(entry) {
            debug!(
                "automount {} already dropped by a concurrent unmount",
                entry.name()
            );
        }
        Ok(())
    }

    fn mount_point(&self, component: &str) -> PathBuf {
        self.config.snapshot_root.join(component)
    }
}

/// Status row describing one active automount.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStatus {
    /// Full `dataset@snapshot` name.
    pub name: String,
    /// Where the snapshot is mounted.
    pub mount_path: PathBuf,
    /// Whether a delayed expiry task is currently scheduled.
    pub expiry_armed: bool,
}

/// Orchestrates on-demand snapshot mounts, their registry bookkeeping and
/// their delayed expiry.
///
/// The registry is in-memory only: nothing is persisted, and mounts left
/// behind by a previous process are not recovered. The next access through
/// the virtual namespace simply triggers a fresh automount.
pub struct MountManager {
    pub(crate) core: Arc<MountCore>,
}

impl MountManager {
    /// Creates a manager from its configuration and external seams.
    pub fn new(
        config: MountConfig,
        store: Arc<dyn SnapshotStore>,
        helper: Arc<dyn MountHelper>,
    ) -> Self {
        Self {
            core: Arc::new(MountCore {
                config,
                registry: SnapshotRegistry::new(),
                store,
                helper,
                automount_lock: Mutex::new(()),
            }),
        }
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &MountConfig {
        &self.core.config
    }

    /// Mounts `full_name` unless it is already an active automount, and
    /// returns the mount path either way.
    ///
    /// At most one caller performs the external mount: concurrent callers
    /// for the same snapshot serialize on an internal lock, observe the
    /// entry the winner registered, and short-circuit. A BUSY status from
    /// the helper means a mount outside this manager already holds the
    /// target; that race is benign and also reported as success.
    pub fn ensure_mounted(&self, full_name: &str) -> Result<PathBuf> {
        let (_, component) = store::split_snapshot_name(full_name)?;
        let core = &self.core;

        // Fast path: already automounted.
        if let Some(entry) = core.registry.find_by_name(full_name) {
            return Ok(entry.mount_path.clone());
        }

        let _guard = core.automount_lock.lock();
        // Re-check: a racing caller may have mounted while we waited.
        if let Some(entry) = core.registry.find_by_name(full_name) {
            return Ok(entry.mount_path.clone());
        }

        let snap = core.store.resolve(full_name)?;
        let mount_path = core.mount_point(component);

        let handle = match core.helper.mount(full_name, &mount_path, core.config.no_setuid) {
            Ok(handle) => handle,
            Err(SnapMountError::Busy { .. }) => {
                debug!("automount of {full_name} raced with an existing mount");
                return Ok(mount_path);
            }
            Err(err) => return Err(err),
        };

        let entry = Arc::new(SnapEntry::new(
            full_name,
            mount_path.clone(),
            snap.pool_id,
            snap.dataset_id,
            handle,
        ));
        core.registry.insert(entry.clone());
        info!("automounted {} at {}", full_name, mount_path.display());
        expiry::arm(core.clone(), entry, core.config.expire_after);

        Ok(mount_path)
    }

    /// Unmounts an active automount by name.
    ///
    /// An unknown name reports [`SnapMountError::NotFound`], distinct from
    /// the [`SnapMountError::Busy`] a failing helper maps to. On success
    /// the entry's pending expiry is canceled and the entry is dropped
    /// from the registry, unless a firing expiry callback already did so
    /// while the helper ran.
    pub fn unmount(&self, full_name: &str, force: bool) -> Result<()> {
        let entry = self
            .core
            .registry
            .find_by_name(full_name)
            .ok_or_else(|| SnapMountError::NotFound(full_name.to_string()))?;

        self.core.helper.unmount(&entry.mount_path, force)?;
        info!("unmounted snapshot {full_name}");
        expiry::cancel(&entry);
        if !self.core.registry.remove_if_registered(&entry) {
            debug!("automount {full_name} already dropped by its expiry");
        }
        Ok(())
    }

    /// Renames a snapshot in storage and re-keys any active automount.
    ///
    /// The storage rename and the registry re-key are not atomic with each
    /// other: if the registry update misses after storage succeeded, the
    /// registry stays stale under the old name until that mount expires.
    /// Name-based lookups self-heal, so this is a documented limitation
    /// rather than an error.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        if !self.core.config.admin_enabled {
            return Err(SnapMountError::PermissionDenied);
        }
        let (old_dataset, _) = store::split_snapshot_name(old_name)?;
        let (new_dataset, _) = store::split_snapshot_name(new_name)?;

        // Snapshots cannot move between datasets.
        if old_dataset != new_dataset {
            return Err(SnapMountError::InvalidName(new_name.to_string()));
        }
        if old_name == new_name {
            return Ok(());
        }

        self.core.store.rename_snapshot(old_name, new_name)?;
        match self.core.registry.rename(old_name, new_name) {
            Ok(()) => info!("renamed snapshot {old_name} to {new_name}"),
            Err(_) => debug!("snapshot {old_name} not automounted; registry unchanged"),
        }
        Ok(())
    }

    /// Cancels any pending expiry for the dataset and arms a new one with
    /// the given delay. Used when an external event indicates recent
    /// activity on the mount.
    pub fn reschedule_expiry(
        &self,
        pool_id: PoolId,
        dataset_id: u64,
        delay: Duration,
    ) -> Result<()> {
        let entry = self
            .core
            .registry
            .find_by_dataset(pool_id, dataset_id)
            .ok_or_else(|| {
                SnapMountError::NotFound(format!("dataset {dataset_id} in pool {}", pool_id.0))
            })?;

        expiry::cancel(&entry);
        expiry::arm(self.core.clone(), entry, delay);
        Ok(())
    }

    /// Whether `full_name` is currently an active automount.
    pub fn is_active(&self, full_name: &str) -> bool {
        self.core.registry.find_by_name(full_name).is_some()
    }

    /// Entry lookup by identifier, for the namespace layer.
    pub fn get_entry_for_dataset(
        &self,
        pool_id: PoolId,
        dataset_id: u64,
    ) -> Option<Arc<SnapEntry>> {
        self.core.registry.find_by_dataset(pool_id, dataset_id)
    }

    /// Status of every active automount, ordered by name.
    pub fn active_snapshots(&self) -> Vec<SnapshotStatus> {
        self.core
            .registry
            .entries()
            .iter()
            .map(|entry| SnapshotStatus {
                name: entry.name(),
                mount_path: entry.mount_path.clone(),
                expiry_armed: entry.task.lock().is_some(),
            })
            .collect()
    }

    /// Creates a snapshot through the storage seam.
    pub fn create(&self, dataset: &str, component: &str) -> Result<()> {
        if !self.core.config.admin_enabled {
            return Err(SnapMountError::PermissionDenied);
        }
        store::component_namecheck(component)?;
        self.core.store.create_snapshot(dataset, component)?;
        info!("created snapshot {dataset}@{component}");
        Ok(())
    }

    /// Destroys a snapshot, force-unmounting it first if it is active.
    pub fn destroy(&self, full_name: &str) -> Result<()> {
        if !self.core.config.admin_enabled {
            return Err(SnapMountError::PermissionDenied);
        }
        store::split_snapshot_name(full_name)?;

        match self.unmount(full_name, true) {
            Ok(()) | Err(SnapMountError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        self.core.store.destroy_snapshot(full_name)?;
        info!("destroyed snapshot {full_name}");
        Ok(())
    }

    /// Cancels every pending expiry task. Mounts themselves are left in
    /// place; the registry is rebuilt from scratch on restart.
    pub fn shutdown(&self) {
        for entry in self.core.registry.entries() {
            expiry::cancel(&entry);
        }
    }
}

impl Drop for MountManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
