//! Error taxonomy for automount operations.
//!
//! Registry invariant violations (duplicate insert, removal of an absent
//! entry) are programming errors and panic instead of appearing here.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the automount registry and orchestrator.
#[derive(Debug, Error)]
pub enum SnapMountError {
    /// The snapshot name or identifier is unknown to the registry or to the
    /// underlying storage.
    #[error("snapshot not found: {0}")]
    NotFound(String),

    /// The external helper reported the mount as busy or in use.
    #[error("resource busy: {}", path.display())]
    Busy {
        /// Mount point that could not be operated on.
        path: PathBuf,
    },

    /// The snapshot name failed syntactic validation.
    #[error("invalid snapshot name: {0:?}")]
    InvalidName(String),

    /// Administrative snapshot operations are disabled by configuration.
    #[error("administrative snapshot operations are disabled")]
    PermissionDenied,

    /// The external helper exited with an unexpected status.
    #[error("helper {program} exited with status {status}")]
    Helper {
        /// Program that was invoked.
        program: String,
        /// Exit status it reported.
        status: i32,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SnapMountError>;
