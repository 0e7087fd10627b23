//! # container-snap
//!
//! Snapshots of OCI images as btrfs subvolumes.
//!
//! Images are pulled into an image store using the btrfs storage driver,
//! which leaves the root filesystem of every image in a subvolume named
//! after its top layer. Writable snapshots of that subvolume can be
//! created, toggled read-only, deleted and made the default subvolume to
//! boot into.
//!
//! ## Usage
//!
//! ```no_run
//! use csnap::manager::ContainerSnap;
//! use csnap::snapshot::SnapshotId;
//! use csnap_btrfs::BtrfsCli;
//! use csnap_common::SnapPaths;
//! use csnap_image::{ContainersStorage, Podman};
//!
//! # fn example() -> csnap_common::SnapResult<()> {
//! let podman = Podman::new("podman", SnapPaths::default());
//! let snap = ContainerSnap::new(ContainersStorage::new(podman), BtrfsCli::default());
//!
//! for snapshot in snap.all_snapshots()? {
//!     println!("{} {}", snapshot.id(), snapshot.readonly);
//! }
//!
//! let next = snap.create_snapshot(&SnapshotId::from("badbf16094bf"))?;
//! snap.switch_to_snapshot(&next.id())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod manager;
pub mod snapshot;

pub use manager::{ContainerSnap, ContainerSnapshot};
pub use snapshot::{Snapshot, SnapshotId};
