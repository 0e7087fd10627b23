//! Joining image store records with live subvolumes.

use std::collections::HashMap;

use csnap_btrfs::{SnapshotFilesystem, SubvolumeInfo};
use csnap_common::{SnapError, SnapResult};
use csnap_image::{Image, ImageStore};
use serde::Serialize;

use super::ContainerSnap;
use crate::snapshot::{Snapshot, SnapshotId};

/// A snapshot known to both the image store and the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSnapshot {
    /// Image and snapshot number.
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// Top layer of the image.
    pub top_layer: String,
    /// Numeric btrfs subvolume ID.
    pub subvolume_id: u64,
    /// Whether the subvolume is read-only.
    pub readonly: bool,
}

impl ContainerSnapshot {
    /// Identifier of the snapshot.
    #[must_use]
    pub fn id(&self) -> SnapshotId {
        self.snapshot.id()
    }
}

/// Match subvolumes against the top layers of `images`.
///
/// Subvolume names are keyed by top layer rather than image ID. Names that
/// do not decode, or decode to an untracked top layer, belong to something
/// else and are skipped.
#[must_use]
pub fn reconcile(images: &[Image], subvolumes: &[SubvolumeInfo]) -> Vec<ContainerSnapshot> {
    let by_top_layer: HashMap<&str, &str> = images
        .iter()
        .map(|img| (img.top_layer.as_str(), img.id.as_str()))
        .collect();

    subvolumes
        .iter()
        .filter_map(|subvolume| {
            let named = Snapshot::parse(&subvolume.name).ok()?;
            let image_id = by_top_layer.get(named.image_id.as_str())?;

            Some(ContainerSnapshot {
                snapshot: Snapshot::new(*image_id, named.number),
                top_layer: named.image_id,
                subvolume_id: subvolume.id,
                readonly: subvolume.readonly,
            })
        })
        .collect()
}

impl<I: ImageStore, F: SnapshotFilesystem> ContainerSnap<I, F> {
    /// All snapshots currently present.
    pub fn all_snapshots(&self) -> SnapResult<Vec<ContainerSnapshot>> {
        let images = self.images.list_images()?;
        let subvolumes = self.filesystem.list_subvolumes(&self.subvolume_root)?;

        let snapshots = reconcile(&images, &subvolumes);
        tracing::debug!(
            images = images.len(),
            subvolumes = subvolumes.len(),
            snapshots = snapshots.len(),
            "Reconciled snapshots"
        );
        Ok(snapshots)
    }

    /// The snapshot stored in the subvolume with the given ID.
    pub fn snapshot_from_subvolume_id(&self, subvolume_id: u64) -> SnapResult<Snapshot> {
        self.all_snapshots()?
            .into_iter()
            .find(|s| s.subvolume_id == subvolume_id)
            .map(|s| s.snapshot)
            .ok_or(SnapError::SnapshotNotFound { subvolume_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, top_layer: &str) -> Image {
        Image {
            id: id.to_string(),
            top_layer: top_layer.to_string(),
            names: Vec::new(),
            created: None,
        }
    }

    #[test]
    fn joins_on_top_layer() {
        let images = [image("I1", "T1")];
        let subvolumes = [
            SubvolumeInfo::new(256, "T1", false),
            SubvolumeInfo::new(257, "T1-work1", true),
            SubvolumeInfo::new(258, "unrelated", false),
            SubvolumeInfo::new(259, "T1-workBAD", false),
        ];

        let snapshots = reconcile(&images, &subvolumes);
        assert_eq!(
            snapshots,
            vec![
                ContainerSnapshot {
                    snapshot: Snapshot::base("I1"),
                    top_layer: "T1".to_string(),
                    subvolume_id: 256,
                    readonly: false,
                },
                ContainerSnapshot {
                    snapshot: Snapshot::new("I1", 1),
                    top_layer: "T1".to_string(),
                    subvolume_id: 257,
                    readonly: true,
                },
            ]
        );
    }

    #[test]
    fn skips_stale_top_layers() {
        let images = [image("I1", "T1")];
        let subvolumes = [
            SubvolumeInfo::new(300, "T2", false),
            SubvolumeInfo::new(301, "T2-work4", false),
            SubvolumeInfo::new(302, "@", false),
        ];
        assert!(reconcile(&images, &subvolumes).is_empty());
    }

    #[test]
    fn no_images() {
        let subvolumes = [SubvolumeInfo::new(256, "T1", false)];
        assert!(reconcile(&[], &subvolumes).is_empty());
    }
}
