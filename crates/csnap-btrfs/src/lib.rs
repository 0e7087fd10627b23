//! # csnap-btrfs
//!
//! Snapshot filesystem primitives for container-snap.
//!
//! This crate provides:
//! - The [`SnapshotFilesystem`] capability consumed by the snapshot core
//! - [`BtrfsCli`], an implementation driving the `btrfs` tool
//! - Discovery of the subvolume currently mounted on `/`

#![warn(missing_docs)]

pub mod cli;
pub mod mountinfo;
pub mod output;
pub mod subvolume;

pub use cli::BtrfsCli;
pub use mountinfo::{MountInfo, find_root_subvolume_id};
pub use subvolume::{SnapshotFilesystem, SubvolumeInfo};
