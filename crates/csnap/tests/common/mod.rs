//! In-memory image store and snapshot filesystem.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use csnap_btrfs::{SnapshotFilesystem, SubvolumeInfo};
use csnap_common::{SnapError, SnapResult};
use csnap_image::{Image, ImageStore};

pub const GRAPH_ROOT: &str = "/var/lib/container-snap/snapshots";

pub fn image(id: &str, top_layer: &str, names: &[&str]) -> Image {
    Image {
        id: id.to_string(),
        top_layer: top_layer.to_string(),
        names: names.iter().map(ToString::to_string).collect(),
        created: None,
    }
}

#[derive(Debug)]
pub struct FakeImageStore {
    pub graph_root: PathBuf,
    pub images: RefCell<Vec<Image>>,
    pub deleted: RefCell<Vec<String>>,
}

impl FakeImageStore {
    pub fn new(images: Vec<Image>) -> Self {
        Self {
            graph_root: PathBuf::from(GRAPH_ROOT),
            images: RefCell::new(images),
            deleted: RefCell::new(Vec::new()),
        }
    }
}

impl ImageStore for FakeImageStore {
    fn graph_root(&self) -> &Path {
        &self.graph_root
    }

    fn list_images(&self) -> SnapResult<Vec<Image>> {
        Ok(self.images.borrow().clone())
    }

    fn delete_image(&self, id: &str) -> SnapResult<()> {
        let mut images = self.images.borrow_mut();
        let before = images.len();
        images.retain(|img| img.id != id);
        if images.len() == before {
            return Err(SnapError::ImageNotFound { id: id.to_string() });
        }
        self.deleted.borrow_mut().push(id.to_string());
        Ok(())
    }
}

/// Records every primitive it is asked to perform.
#[derive(Debug, Default)]
pub struct FakeFilesystem {
    pub subvolumes: RefCell<Vec<SubvolumeInfo>>,
    pub default_id: RefCell<u64>,
    pub snapshots: RefCell<Vec<(PathBuf, PathBuf)>>,
    pub deleted: RefCell<Vec<PathBuf>>,
    pub defaults_set: RefCell<Vec<PathBuf>>,
    pub readonly_set: RefCell<Vec<(PathBuf, bool)>>,
}

impl FakeFilesystem {
    pub fn new(subvolumes: Vec<SubvolumeInfo>) -> Self {
        Self {
            subvolumes: RefCell::new(subvolumes),
            ..Self::default()
        }
    }
}

impl SnapshotFilesystem for FakeFilesystem {
    fn list_subvolumes(&self, _root: &Path) -> SnapResult<Vec<SubvolumeInfo>> {
        Ok(self.subvolumes.borrow().clone())
    }

    fn create_snapshot(&self, source: &Path, dest: &Path) -> SnapResult<()> {
        self.snapshots
            .borrow_mut()
            .push((source.to_path_buf(), dest.to_path_buf()));
        Ok(())
    }

    fn delete_subvolume(&self, path: &Path) -> SnapResult<()> {
        self.deleted.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn get_readonly(&self, path: &Path) -> SnapResult<bool> {
        Ok(self
            .readonly_set
            .borrow()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .is_some_and(|(_, ro)| *ro))
    }

    fn set_readonly(&self, path: &Path, readonly: bool) -> SnapResult<()> {
        self.readonly_set
            .borrow_mut()
            .push((path.to_path_buf(), readonly));
        Ok(())
    }

    fn get_default_subvolume(&self, _mountpoint: &Path) -> SnapResult<u64> {
        Ok(*self.default_id.borrow())
    }

    fn set_default_subvolume(&self, path: &Path) -> SnapResult<()> {
        self.defaults_set.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}
