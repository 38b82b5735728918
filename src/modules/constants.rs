//! Automount constants and default values.

/// Seconds an idle automounted snapshot stays mounted before it expires.
pub const DEFAULT_EXPIRE_SECS: u64 = 300;

/// Default directory under which per-snapshot mount points are created.
pub const DEFAULT_SNAPSHOT_ROOT: &str = "/.zfs/snapshot";

/// Program used to invoke the external mount and unmount helpers.
pub const HELPER_PROGRAM: &str = "/usr/bin/env";

/// Filesystem type passed to the mount and unmount helpers.
pub const FS_TYPE: &str = "zfs";

/// Exit status the mount helper reports when the target is already busy,
/// typically because a concurrent mount won the race.
pub const MOUNT_EXIT_BUSY: i32 = 16;

/// Longest accepted full `dataset@snapshot` name, including the separator.
pub const MAX_NAME_LEN: usize = 256;
