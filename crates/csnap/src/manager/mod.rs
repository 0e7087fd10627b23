//! Snapshot management on top of an image store and a snapshot filesystem.
//!
//! Images are pulled into a containers-storage graph root using the btrfs
//! driver, where every top layer is a subvolume. Snapshots of an image are
//! writable btrfs snapshots of that subvolume, saved next to it as
//! `<top-layer>-work<N>`.
//!
//! Nothing is persisted besides subvolume names and the image store's own
//! records: every query joins the two again. Concurrent invocations are not
//! coordinated; two processes creating the same snapshot number race and
//! the loser fails with `DestinationExists`.

mod lifecycle;
mod reconcile;

use std::path::{Path, PathBuf};

use csnap_btrfs::SnapshotFilesystem;
use csnap_image::ImageStore;

pub use reconcile::{ContainerSnapshot, reconcile};

/// Snapshot manager.
#[derive(Debug)]
pub struct ContainerSnap<I, F> {
    /// Image store holding the images and their top layers.
    images: I,
    /// Filesystem holding the subvolumes.
    filesystem: F,
    /// Path below which subvolumes are listed.
    subvolume_root: PathBuf,
    /// Mount point whose default subvolume is queried and set.
    mountpoint: PathBuf,
}

impl<I: ImageStore, F: SnapshotFilesystem> ContainerSnap<I, F> {
    /// Create a manager listing subvolumes of the filesystem mounted on `/`.
    pub fn new(images: I, filesystem: F) -> Self {
        Self {
            images,
            filesystem,
            subvolume_root: PathBuf::from("/"),
            mountpoint: PathBuf::from("/"),
        }
    }

    /// List subvolumes below `path` instead of `/`.
    #[must_use]
    pub fn with_subvolume_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.subvolume_root = path.into();
        self
    }

    /// Query and set the default subvolume of `path` instead of `/`.
    #[must_use]
    pub fn with_mountpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.mountpoint = path.into();
        self
    }

    /// The image store.
    pub const fn images(&self) -> &I {
        &self.images
    }

    /// The snapshot filesystem.
    pub const fn filesystem(&self) -> &F {
        &self.filesystem
    }

    /// Graph root of the image store.
    pub fn graph_root(&self) -> &Path {
        self.images.graph_root()
    }
}
