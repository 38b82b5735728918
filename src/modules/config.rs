//! Configuration for the automount manager.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_EXPIRE_SECS, DEFAULT_SNAPSHOT_ROOT};

/// Tunables controlling automount behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// How long an idle automount stays mounted before it is unmounted.
    /// Zero disables automatic expiry.
    pub expire_after: Duration,
    /// Allow snapshot create, rename and destroy through the control
    /// namespace.
    pub admin_enabled: bool,
    /// Mount automounted snapshots with the `nosuid` option.
    pub no_setuid: bool,
    /// Directory under which snapshot mount points are created.
    pub snapshot_root: PathBuf,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            expire_after: Duration::from_secs(DEFAULT_EXPIRE_SECS),
            admin_enabled: false,
            no_setuid: false,
            snapshot_root: PathBuf::from(DEFAULT_SNAPSHOT_ROOT),
        }
    }
}
