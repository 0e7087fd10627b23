//! Image store.
//!
//! The snapshot core only needs to list images with their top layer and to
//! delete them. [`ContainersStorage`] reads the image index the
//! containers-storage btrfs driver keeps under the graph root and mutates
//! the store through `podman`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use csnap_common::{SnapError, SnapPaths, SnapResult};
use serde::{Deserialize, Serialize};

use crate::podman::Podman;

/// Placeholder printed for images without a name.
pub const UNKNOWN_NAME: &str = "unknown-name";

/// An image record of the image store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Content-addressed image ID.
    pub id: String,
    /// ID of the image's top layer, which names its base subvolume.
    #[serde(rename = "layer", default)]
    pub top_layer: String,
    /// Names (references) the image is known by.
    #[serde(default)]
    pub names: Vec<String>,
    /// Creation time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl Image {
    /// First name of the image, or a placeholder.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.names.first().map_or(UNKNOWN_NAME, String::as_str)
    }
}

/// Image store capability.
pub trait ImageStore {
    /// Graph root of the store; subvolumes live below it.
    fn graph_root(&self) -> &Path;

    /// List all images.
    fn list_images(&self) -> SnapResult<Vec<Image>>;

    /// Delete an image together with its layers.
    fn delete_image(&self, id: &str) -> SnapResult<()>;

    /// Look up the images with the given IDs, in order.
    ///
    /// IDs the store does not know are skipped with a warning.
    fn find_images(&self, ids: &[String]) -> SnapResult<Vec<Image>> {
        let images = self.list_images()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                let found = images.iter().find(|img| &img.id == id).cloned();
                if found.is_none() {
                    tracing::warn!(id = %id, "Image missing from image store");
                }
                found
            })
            .collect())
    }
}

/// containers-storage graph root using the btrfs driver.
#[derive(Debug, Clone)]
pub struct ContainersStorage {
    podman: Podman,
}

impl ContainersStorage {
    /// Open the store managed through `podman`.
    pub fn new(podman: Podman) -> Self {
        Self { podman }
    }

    /// Store layout.
    pub fn paths(&self) -> &SnapPaths {
        self.podman.paths()
    }

    /// Parse an image index document.
    pub fn parse_index(content: &str) -> SnapResult<Vec<Image>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(content)?)
    }
}

impl ImageStore for ContainersStorage {
    fn graph_root(&self) -> &Path {
        self.paths().graph_root()
    }

    fn list_images(&self) -> SnapResult<Vec<Image>> {
        let path = self.paths().images_index();
        tracing::debug!(path = %path.display(), "Loading image index");

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse_index(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_image(&self, id: &str) -> SnapResult<()> {
        if !self.list_images()?.iter().any(|img| img.id == id) {
            return Err(SnapError::ImageNotFound { id: id.to_string() });
        }

        tracing::info!(id, "Deleting image from store");
        self.podman.run(
            "podman rmi",
            self.podman.command().args(["rmi", "--force", id]),
        )?;
        tracing::info!(id, "Image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"[
  {
    "id": "a1b2c3",
    "digest": "sha256:ffff",
    "names": ["registry.opensuse.org/opensuse/tumbleweed:latest"],
    "layer": "badbf160",
    "metadata": "{}",
    "big-data-names": ["manifest"],
    "created": "2024-05-01T10:20:30.123456789Z"
  },
  {
    "id": "d4e5f6",
    "layer": "0fe1c2"
  }
]"#;

    #[test]
    fn parse_index() {
        let images = ContainersStorage::parse_index(INDEX).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id, "a1b2c3");
        assert_eq!(images[0].top_layer, "badbf160");
        assert_eq!(
            images[0].display_name(),
            "registry.opensuse.org/opensuse/tumbleweed:latest"
        );
        assert!(images[0].created.is_some());
        assert_eq!(images[1].display_name(), UNKNOWN_NAME);
        assert!(images[1].created.is_none());
    }

    #[test]
    fn parse_empty_index() {
        assert!(ContainersStorage::parse_index("").unwrap().is_empty());
        assert!(ContainersStorage::parse_index("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_broken_index() {
        let err = ContainersStorage::parse_index("{").unwrap_err();
        assert!(matches!(err, SnapError::Serialization(_)));
    }
}
