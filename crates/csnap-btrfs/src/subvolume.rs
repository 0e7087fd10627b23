//! Snapshot filesystem capability.

use std::path::Path;

use csnap_common::SnapResult;

/// A subvolume as reported by the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubvolumeInfo {
    /// Numeric subvolume ID.
    pub id: u64,
    /// Basename of the subvolume path.
    pub name: String,
    /// Whether the subvolume is read-only.
    pub readonly: bool,
}

impl SubvolumeInfo {
    /// Create a subvolume record.
    pub fn new(id: u64, name: impl Into<String>, readonly: bool) -> Self {
        Self {
            id,
            name: name.into(),
            readonly,
        }
    }
}

/// Copy-on-write subvolume operations.
///
/// Paths are passed through verbatim. Callers strip trailing separators
/// before calling [`SnapshotFilesystem::delete_subvolume`].
pub trait SnapshotFilesystem {
    /// List all subvolumes reachable below `path`.
    fn list_subvolumes(&self, path: &Path) -> SnapResult<Vec<SubvolumeInfo>>;

    /// Create a writable snapshot of `source` at `dest`.
    ///
    /// Fails with `SourceNotFound` or `DestinationExists` when the
    /// preconditions do not hold.
    fn create_snapshot(&self, source: &Path, dest: &Path) -> SnapResult<()>;

    /// Delete the subvolume at `path`.
    fn delete_subvolume(&self, path: &Path) -> SnapResult<()>;

    /// Read the `ro` property of a subvolume.
    fn get_readonly(&self, path: &Path) -> SnapResult<bool>;

    /// Write the `ro` property of a subvolume.
    fn set_readonly(&self, path: &Path, readonly: bool) -> SnapResult<()>;

    /// ID of the default subvolume of the filesystem mounted at `mountpoint`.
    fn get_default_subvolume(&self, mountpoint: &Path) -> SnapResult<u64>;

    /// Make the subvolume at `path` the default of its filesystem.
    fn set_default_subvolume(&self, path: &Path) -> SnapResult<()>;
}
