//! Standard filesystem paths for container-snap.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

/// Default root directory for container-snap data.
pub static CSNAP_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("CONTAINER_SNAP_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/var/lib/container-snap"))
});

/// Storage driver the image store is configured with.
pub const STORAGE_DRIVER: &str = "btrfs";

/// Directory holding one subvolume per top layer and per snapshot.
#[must_use]
pub fn subvolumes_dir(graph_root: &Path) -> PathBuf {
    graph_root.join(STORAGE_DRIVER).join("subvolumes")
}

/// Layout of the snapshot store below its root directory.
#[derive(Debug, Clone)]
pub struct SnapPaths {
    /// Root data directory (default: /var/lib/container-snap).
    pub root: PathBuf,
    /// Graph root of the image store.
    pub graph_root: PathBuf,
    /// Run root of the image store.
    pub run_root: PathBuf,
}

impl SnapPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let graph_root = root.join("snapshots");
        let run_root = root.join("runroot");
        Self {
            root,
            graph_root,
            run_root,
        }
    }

    /// Graph root of the image store.
    #[must_use]
    pub fn graph_root(&self) -> &Path {
        &self.graph_root
    }

    /// Image index maintained by the image store.
    #[must_use]
    pub fn images_index(&self) -> PathBuf {
        self.graph_root
            .join(format!("{STORAGE_DRIVER}-images"))
            .join("images.json")
    }
}

impl Default for SnapPaths {
    fn default() -> Self {
        Self::with_root(CSNAP_ROOT.clone())
    }
}
