//! Snapshot identifiers and their subvolume layout.

mod id;
mod layout;

pub use id::{Snapshot, SnapshotId, WORK_SEPARATOR};
pub use layout::{subvolume_dir, trim_trailing_separator};
