//! Root subvolume discovery from the process mount table.
//!
//! Each line of `/proc/<pid>/mountinfo` looks like
//!
//! ```text
//! 68 2 0:36 /@/some/subvol / rw,relatime shared:1 - btrfs /dev/vda3 rw,subvolid=269,subvol=/@/some/subvol
//! ```
//!
//! i.e. mount ID, parent ID, `major:minor`, root, mount point, mount options,
//! zero or more optional fields, a `-` separator, filesystem type, mount
//! source and superblock options.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use csnap_common::{SnapError, SnapResult};

/// Mount table of the calling thread.
pub const MOUNTINFO_PATH: &str = "/proc/thread-self/mountinfo";

/// One entry of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Unique mount ID.
    pub id: u32,
    /// ID of the parent mount.
    pub parent: u32,
    /// Device major number.
    pub major: u32,
    /// Device minor number.
    pub minor: u32,
    /// Root of the mount within the filesystem.
    pub root: String,
    /// Mount point relative to the process root.
    pub mount_point: String,
    /// Per-mount options.
    pub options: String,
    /// Optional tagged fields (`shared:N`, `master:N`, ...).
    pub optional: Vec<String>,
    /// Filesystem type.
    pub fs_type: String,
    /// Mount source.
    pub source: String,
    /// Per-superblock (VFS) options.
    pub super_options: String,
}

impl MountInfo {
    /// Value of a `key=value` superblock option.
    ///
    /// Bare keys and empty values yield `None`.
    #[must_use]
    pub fn super_option(&self, key: &str) -> Option<&str> {
        self.super_options
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .filter(|v| !v.is_empty())
    }
}

impl FromStr for MountInfo {
    type Err = SnapError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || SnapError::MalformedMountInfo {
            line: line.to_string(),
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let separator = fields
            .iter()
            .skip(6)
            .position(|f| *f == "-")
            .map(|p| p + 6)
            .ok_or_else(malformed)?;
        if fields.len() < separator + 4 {
            return Err(malformed());
        }

        let (major, minor) = fields[2].split_once(':').ok_or_else(malformed)?;

        Ok(Self {
            id: fields[0].parse().map_err(|_| malformed())?,
            parent: fields[1].parse().map_err(|_| malformed())?,
            major: major.parse().map_err(|_| malformed())?,
            minor: minor.parse().map_err(|_| malformed())?,
            root: unescape(fields[3]),
            mount_point: unescape(fields[4]),
            options: fields[5].to_string(),
            optional: fields[6..separator].iter().map(|f| (*f).to_string()).collect(),
            fs_type: fields[separator + 1].to_string(),
            source: unescape(fields[separator + 2]),
            super_options: fields[separator + 3].to_string(),
        })
    }
}

/// Decode the octal escapes (`\040` for space, ...) the kernel emits.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Parse a whole mount table.
pub fn parse_mountinfo(reader: impl BufRead) -> SnapResult<Vec<MountInfo>> {
    let mut mounts = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        mounts.push(line.parse()?);
    }
    Ok(mounts)
}

/// Find the numeric ID of the subvolume mounted on `/`.
///
/// The table must contain exactly one mount on `/`, and its superblock
/// options must carry both `subvolid=` and `subvol=`.
pub fn find_root_subvolume_id(reader: impl BufRead) -> SnapResult<u64> {
    let roots: Vec<MountInfo> = parse_mountinfo(reader)?
        .into_iter()
        .filter(|m| m.mount_point == "/")
        .collect();

    let [root] = roots.as_slice() else {
        return Err(SnapError::AmbiguousRootMount { count: roots.len() });
    };

    let (Some(subvol_id), Some(subvol)) = (root.super_option("subvolid"), root.super_option("subvol"))
    else {
        return Err(SnapError::MissingSubvolumeInfo {
            options: root.super_options.clone(),
        });
    };

    let id = subvol_id
        .parse::<u64>()
        .map_err(|_| SnapError::InvalidSubvolumeId {
            value: subvol_id.to_string(),
        })?;

    tracing::debug!(subvolume_id = id, subvolume = subvol, "Found root subvolume");
    Ok(id)
}

/// Find the root subvolume ID from a mount table file.
pub fn find_root_subvolume_id_from(path: &Path) -> SnapResult<u64> {
    let file = File::open(path)?;
    find_root_subvolume_id(BufReader::new(file))
}

/// Find the subvolume the running system was booted from.
pub fn current_root_subvolume_id() -> SnapResult<u64> {
    find_root_subvolume_id_from(Path::new(MOUNTINFO_PATH))
}
