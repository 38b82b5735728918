//! External mount helper invocation.
//!
//! Mounting and unmounting are delegated to the system mount(8) and
//! umount(8) utilities. The helper has no structured error channel: a zero
//! exit status is success and any other status maps into the busy/failure
//! taxonomy. Helper calls block for the lifetime of the external process
//! and are never made while a registry lock is held.

use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::process::Command;

use log::{debug, warn};

use super::constants::{FS_TYPE, HELPER_PROGRAM, MOUNT_EXIT_BUSY};
use super::entry::MountHandle;
use super::error::{Result, SnapMountError};

/// Invokes the external mount and unmount helpers.
pub trait MountHelper: Send + Sync {
    /// Mounts the snapshot `full_name` at `mount_path`, returning a handle
    /// to the root of the mounted filesystem.
    fn mount(&self, full_name: &str, mount_path: &Path, no_setuid: bool) -> Result<MountHandle>;

    /// Unmounts the filesystem at `mount_path`.
    fn unmount(&self, mount_path: &Path, force: bool) -> Result<()>;
}

/// Helper implementation shelling out to the system mount utilities.
pub struct SystemHelper;

impl MountHelper for SystemHelper {
    fn mount(&self, full_name: &str, mount_path: &Path, no_setuid: bool) -> Result<MountHandle> {
        let options = if no_setuid { "nosuid" } else { "suid" };

        debug!("mount; name={} path={}", full_name, mount_path.display());
        let status = Command::new(HELPER_PROGRAM)
            .args(["mount", "-t", FS_TYPE, "-n", "-o", options, full_name])
            .arg(mount_path)
            .status()?;

        match status.code() {
            Some(0) => {
                let meta = std::fs::metadata(mount_path)?;
                Ok(MountHandle(meta.ino()))
            }
            Some(code) if code == MOUNT_EXIT_BUSY => Err(SnapMountError::Busy {
                path: mount_path.to_path_buf(),
            }),
            code => {
                warn!(
                    "unable to automount {} status={:?}",
                    mount_path.display(),
                    code
                );
                Err(SnapMountError::Helper {
                    program: HELPER_PROGRAM.to_string(),
                    status: code.unwrap_or(-1),
                })
            }
        }
    }

    fn unmount(&self, mount_path: &Path, force: bool) -> Result<()> {
        debug!("unmount; path={}", mount_path.display());
        let status = Command::new(HELPER_PROGRAM)
            .args(["umount", "-t", FS_TYPE])
            .arg(if force { "-fn" } else { "-n" })
            .arg(mount_path)
            .status()?;

        if status.success() {
            Ok(())
        } else {
            // umount(8) reports a plain nonzero status on failure. Assume
            // the filesystem is busy; there is no finer-grained signal.
            Err(SnapMountError::Busy {
                path: mount_path.to_path_buf(),
            })
        }
    }
}
