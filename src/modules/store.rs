//! Snapshot name handling and the storage-side seam.
//!
//! The automount core never talks to the storage system directly. A
//! [`SnapshotStore`] translates snapshot names into stable identifiers and
//! performs the administrative create, rename and destroy calls; the
//! bundled [`ZfsStore`] does so through the zfs(8) and zpool(8) utilities.

use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::constants::MAX_NAME_LEN;
use super::entry::PoolId;
use super::error::{Result, SnapMountError};

/// Resolution result for a snapshot name.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotInfo {
    /// Owning pool.
    pub pool_id: PoolId,
    /// Dataset identifier unique within the pool, stable for the
    /// snapshot's lifetime.
    pub dataset_id: u64,
    /// Creation time of the snapshot.
    pub created: SystemTime,
}

/// Storage-side operations the automount core depends on.
pub trait SnapshotStore: Send + Sync {
    /// Resolves a full `dataset@snapshot` name to its identifiers.
    fn resolve(&self, full_name: &str) -> Result<SnapshotInfo>;

    /// Renames a snapshot in the underlying storage.
    fn rename_snapshot(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Creates a new snapshot of `dataset` named `component`.
    fn create_snapshot(&self, dataset: &str, component: &str) -> Result<()>;

    /// Destroys a snapshot.
    fn destroy_snapshot(&self, full_name: &str) -> Result<()>;
}

/// Checks one snapshot name component: non-empty, bounded, and restricted
/// to the portable snapshot charset.
pub fn component_namecheck(component: &str) -> Result<()> {
    if component.is_empty() || component.len() >= MAX_NAME_LEN {
        return Err(SnapMountError::InvalidName(component.to_string()));
    }
    let valid = component
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'));
    if !valid {
        return Err(SnapMountError::InvalidName(component.to_string()));
    }
    Ok(())
}

/// Splits a full `dataset@snapshot` name, validating both halves.
pub fn split_snapshot_name(full_name: &str) -> Result<(&str, &str)> {
    if full_name.len() >= MAX_NAME_LEN {
        return Err(SnapMountError::InvalidName(full_name.to_string()));
    }
    let (dataset, component) = full_name
        .split_once('@')
        .ok_or_else(|| SnapMountError::InvalidName(full_name.to_string()))?;
    if dataset.is_empty() || component.contains('@') {
        return Err(SnapMountError::InvalidName(full_name.to_string()));
    }
    let dataset_valid = dataset
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-' | '/'));
    if !dataset_valid {
        return Err(SnapMountError::InvalidName(full_name.to_string()));
    }
    component_namecheck(component)?;
    Ok((dataset, component))
}

/// Storage seam implemented against the system zfs(8) and zpool(8)
/// utilities.
pub struct ZfsStore;

impl ZfsStore {
    /// Creates a store backed by the system `zfs` utilities.
    pub fn new() -> Self {
        Self
    }

    fn capture(cmd: &mut Command, subject: &str) -> Result<String> {
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(SnapMountError::NotFound(subject.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn capture_u64(cmd: &mut Command, subject: &str) -> Result<u64> {
        Self::capture(cmd, subject)?
            .parse()
            .map_err(|_| SnapMountError::NotFound(subject.to_string()))
    }

    fn run(args: &[&str]) -> Result<()> {
        let status = Command::new("zfs").args(args).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(SnapMountError::Helper {
                program: "zfs".to_string(),
                status: status.code().unwrap_or(-1),
            })
        }
    }
}

impl Default for ZfsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for ZfsStore {
    fn resolve(&self, full_name: &str) -> Result<SnapshotInfo> {
        let (dataset, _) = split_snapshot_name(full_name)?;
        let pool = dataset.split('/').next().unwrap_or(dataset);

        let dataset_id = Self::capture_u64(
            Command::new("zfs").args(["list", "-H", "-p", "-o", "guid", full_name]),
            full_name,
        )?;
        let pool_guid = Self::capture_u64(
            Command::new("zpool").args(["get", "-H", "-p", "-o", "value", "guid", pool]),
            pool,
        )?;
        let creation = Self::capture_u64(
            Command::new("zfs").args(["get", "-H", "-p", "-o", "value", "creation", full_name]),
            full_name,
        )?;

        Ok(SnapshotInfo {
            pool_id: PoolId(pool_guid),
            dataset_id,
            created: UNIX_EPOCH + Duration::from_secs(creation),
        })
    }

    fn rename_snapshot(&self, old_name: &str, new_name: &str) -> Result<()> {
        Self::run(&["rename", old_name, new_name])
    }

    fn create_snapshot(&self, dataset: &str, component: &str) -> Result<()> {
        Self::run(&["snapshot", &format!("{dataset}@{component}")])
    }

    fn destroy_snapshot(&self, full_name: &str) -> Result<()> {
        Self::run(&["destroy", full_name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_valid_name() {
        let (dataset, component) = split_snapshot_name("pool/fs@s1").unwrap();
        assert_eq!(dataset, "pool/fs");
        assert_eq!(component, "s1");
    }

    #[test]
    fn test_split_rejects_malformed_names() {
        for name in [
            "",
            "pool/fs",
            "@s1",
            "pool/fs@",
            "pool/fs@a@b",
            "pool/fs@bad name",
            "pool fs@s1",
        ] {
            assert!(
                matches!(split_snapshot_name(name), Err(SnapMountError::InvalidName(_))),
                "expected {name:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_split_rejects_overlong_name() {
        let name = format!("pool/fs@{}", "s".repeat(MAX_NAME_LEN));
        assert!(matches!(
            split_snapshot_name(&name),
            Err(SnapMountError::InvalidName(_))
        ));
    }

    #[test]
    fn test_component_charset() {
        component_namecheck("daily-2024.08.26:00").unwrap();
        component_namecheck("snap_1").unwrap();
        assert!(component_namecheck("").is_err());
        assert!(component_namecheck("a/b").is_err());
        assert!(component_namecheck("a b").is_err());
    }
}
