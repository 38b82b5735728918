#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! snapmnt: on-demand automounting of filesystem snapshots
//!
//! Snapshots exposed through a virtual control directory are mounted
//! transparently on first access, tracked while active, and unmounted
//! automatically once they have been idle for a configured delay.
//!
//! ## Features
//!
//! - Dual-index registry of active automounts (by name and by dataset
//!   identifier), consistent under concurrent lookups and renames
//! - Delayed expiry with cancel and reschedule, retrying busy mounts
//! - At most one external mount per snapshot under concurrent access
//! - Administrative snapshot create, rename and destroy, gated by
//!   configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapmnt::{MountConfig, MountManager, SystemHelper, ZfsStore};
//! use std::sync::Arc;
//!
//! # fn main() -> snapmnt::Result<()> {
//! let manager = MountManager::new(
//!     MountConfig::default(),
//!     Arc::new(ZfsStore::new()),
//!     Arc::new(SystemHelper),
//! );
//!
//! // Triggered by a lookup in the virtual snapshot directory.
//! let path = manager.ensure_mounted("pool/fs@monday")?;
//! println!("snapshot available at {}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod modules;

pub use modules::config::MountConfig;
pub use modules::entry::{MountHandle, PoolId, SnapEntry};
pub use modules::error::{Result, SnapMountError};
pub use modules::manager::{MountManager, SnapshotStatus};

// Re-export the external seams
pub use modules::helper::{MountHelper, SystemHelper};
pub use modules::store::{SnapshotInfo, SnapshotStore, ZfsStore};
