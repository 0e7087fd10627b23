//! On-disk location of snapshot subvolumes.

use std::path::Path;

use csnap_common::paths::subvolumes_dir;

use super::id::{Snapshot, WORK_SEPARATOR};

/// Subvolume directory of `snapshot`, with a trailing separator.
///
/// The base snapshot is the top layer subvolume of its image; derived
/// snapshots are siblings named `<top-layer>-work<N>`.
#[must_use]
pub fn subvolume_dir(graph_root: &Path, top_layer: &str, snapshot: &Snapshot) -> String {
    let base = format!("{}/{top_layer}", subvolumes_dir(graph_root).display());
    if snapshot.is_base() {
        format!("{base}/")
    } else {
        format!("{base}{WORK_SEPARATOR}{}/", snapshot.number)
    }
}

/// Strip trailing separators; subvolume deletion rejects them.
#[must_use]
pub fn trim_trailing_separator(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { path } else { trimmed }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/var/lib/container-snap/snapshots";

    #[test]
    fn base_dir() {
        let dir = subvolume_dir(Path::new(ROOT), "badbf160", &Snapshot::base("img"));
        assert_eq!(
            dir,
            "/var/lib/container-snap/snapshots/btrfs/subvolumes/badbf160/"
        );
        assert!(dir.ends_with("badbf160/"));
    }

    #[test]
    fn work_dir() {
        let dir = subvolume_dir(Path::new(ROOT), "badbf160", &Snapshot::new("img", 3));
        assert!(dir.ends_with("badbf160-work3/"));
    }

    #[test]
    fn trim() {
        assert_eq!(trim_trailing_separator("/a/b-work1/"), "/a/b-work1");
        assert_eq!(trim_trailing_separator("/a/b"), "/a/b");
        assert_eq!(trim_trailing_separator("/"), "/");
    }
}
