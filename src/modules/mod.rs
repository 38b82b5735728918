//! Core automount modules.
//!
//! This module provides the main components of the automount core:
//!
//! - `config`: Tunables controlling automount behaviour
//! - `constants`: Defaults and helper exit codes
//! - `entry`: The record tracking one active automount
//! - `error`: Error taxonomy for automount operations
//! - `expiry`: Delayed unmount of idle snapshots
//! - `helper`: External mount/umount helper invocation
//! - `manager`: Mount/unmount orchestration
//! - `registry`: Dual-index registry of active automounts
//! - `store`: Snapshot name handling and the storage seam

pub mod config;
pub mod constants;
pub mod entry;
pub mod error;
pub mod expiry;
pub mod helper;
pub mod manager;
pub mod registry;
pub mod store;

#[cfg(test)]
pub mod testutil;
