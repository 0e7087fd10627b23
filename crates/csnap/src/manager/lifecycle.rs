//! Snapshot lifecycle: create, delete, switch and read-only state.
//!
//! Each operation resolves the identifier to a subvolume path and then
//! issues a single filesystem or image store primitive.

use std::path::Path;

use csnap_btrfs::SnapshotFilesystem;
use csnap_btrfs::mountinfo::{current_root_subvolume_id, find_root_subvolume_id_from};
use csnap_common::{SnapError, SnapResult};
use csnap_image::{ImageReference, ImageStore};

use super::ContainerSnap;
use crate::snapshot::{Snapshot, SnapshotId, subvolume_dir, trim_trailing_separator};

impl<I: ImageStore, F: SnapshotFilesystem> ContainerSnap<I, F> {
    /// Top layer of the image with the given ID.
    pub fn top_layer(&self, image_id: &str) -> SnapResult<String> {
        self.images
            .list_images()?
            .into_iter()
            .find(|img| img.id == image_id)
            .map(|img| img.top_layer)
            .ok_or_else(|| SnapError::ImageNotFound {
                id: image_id.to_string(),
            })
    }

    /// Subvolume directory of a snapshot, with a trailing separator.
    pub fn snapshot_dir(&self, snapshot: &Snapshot) -> SnapResult<String> {
        let top_layer = self.top_layer(&snapshot.image_id)?;
        Ok(subvolume_dir(self.graph_root(), &top_layer, snapshot))
    }

    /// Root directory of the snapshot with the given ID.
    pub fn mounted_image_dir(&self, id: &SnapshotId) -> SnapResult<String> {
        let snapshot = Snapshot::try_from(id)?;
        self.snapshot_dir(&snapshot)
    }

    /// Snapshot `base` into the next snapshot number.
    ///
    /// The new number is one above `base`'s own number; existing snapshots
    /// are not scanned. Pass the highest existing snapshot to append.
    pub fn create_snapshot(&self, base: &SnapshotId) -> SnapResult<Snapshot> {
        let base = Snapshot::try_from(base)?;
        let next = base.next()?;

        let top_layer = self.top_layer(&base.image_id)?;
        let source = subvolume_dir(self.graph_root(), &top_layer, &base);
        let dest = subvolume_dir(self.graph_root(), &top_layer, &next);

        tracing::debug!(base = %base, next = %next, "Creating snapshot");
        self.filesystem
            .create_snapshot(Path::new(&source), Path::new(&dest))?;

        tracing::info!(snapshot = %next, "Snapshot created");
        Ok(next)
    }

    /// Delete a snapshot.
    ///
    /// The base snapshot is the image itself, so deleting it deletes the
    /// image from the store, which drops its top layer subvolume.
    pub fn delete_snapshot(&self, id: &SnapshotId) -> SnapResult<()> {
        let snapshot = Snapshot::try_from(id)?;

        if snapshot.is_base() {
            tracing::info!(image = %snapshot.image_id, "Deleting image");
            return self.images.delete_image(&snapshot.image_id);
        }

        let dir = self.snapshot_dir(&snapshot)?;
        self.filesystem
            .delete_subvolume(Path::new(trim_trailing_separator(&dir)))?;

        tracing::info!(snapshot = %snapshot, "Snapshot deleted");
        Ok(())
    }

    /// Delete every image with a name referring to `name`.
    ///
    /// Returns the IDs of the deleted images.
    pub fn delete_images_named(&self, name: &str) -> SnapResult<Vec<String>> {
        let matching: Vec<String> = self
            .images
            .list_images()?
            .into_iter()
            .filter(|img| img.names.iter().any(|n| ImageReference::same_image(n, name)))
            .map(|img| img.id)
            .collect();

        if matching.is_empty() {
            return Err(SnapError::ImageNotFound {
                id: name.to_string(),
            });
        }

        for id in &matching {
            self.images.delete_image(id)?;
        }
        Ok(matching)
    }

    /// Make the snapshot the default subvolume, booted from next time.
    ///
    /// The running system is not affected.
    pub fn switch_to_snapshot(&self, id: &SnapshotId) -> SnapResult<()> {
        let dir = self.mounted_image_dir(id)?;
        self.filesystem.set_default_subvolume(Path::new(&dir))?;

        tracing::info!(snapshot = %id, "Switched default snapshot");
        Ok(())
    }

    /// Set whether the snapshot is read-only.
    pub fn set_readonly(&self, id: &SnapshotId, readonly: bool) -> SnapResult<()> {
        let dir = self.mounted_image_dir(id)?;
        self.filesystem.set_readonly(Path::new(&dir), readonly)
    }

    /// Whether the snapshot is read-only.
    pub fn get_readonly(&self, id: &SnapshotId) -> SnapResult<bool> {
        let dir = self.mounted_image_dir(id)?;
        self.filesystem.get_readonly(Path::new(&dir))
    }

    /// The snapshot set as default subvolume, i.e. booted next time.
    pub fn default_snapshot(&self) -> SnapResult<Snapshot> {
        let subvolume_id = self.filesystem.get_default_subvolume(&self.mountpoint)?;
        self.snapshot_from_subvolume_id(subvolume_id)
    }

    /// The snapshot the running system is booted from.
    ///
    /// Reads the given mount table, or the one of the calling thread.
    pub fn current_snapshot(&self, mountinfo: Option<&Path>) -> SnapResult<Snapshot> {
        let subvolume_id = match mountinfo {
            Some(path) => find_root_subvolume_id_from(path)?,
            None => current_root_subvolume_id()?,
        };
        self.snapshot_from_subvolume_id(subvolume_id)
    }
}
