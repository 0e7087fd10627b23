//! Root subvolume discovery against a real-world mount table.

use std::path::Path;

use csnap_btrfs::mountinfo::{
    MOUNTINFO_PATH, current_root_subvolume_id, find_root_subvolume_id,
    find_root_subvolume_id_from, parse_mountinfo,
};
use csnap_common::SnapError;

const MOUNTINFO: &str = include_str!("fixtures/mountinfo.txt");
const MOUNTINFO_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mountinfo.txt");

#[test_log::test]
fn finds_root_subvolume() {
    let id = find_root_subvolume_id(MOUNTINFO.as_bytes()).unwrap();
    assert_eq!(id, 269);
}

#[test]
fn parses_every_entry() {
    let mounts = parse_mountinfo(MOUNTINFO.as_bytes()).unwrap();
    assert_eq!(mounts.len(), 31);
    assert_eq!(mounts.iter().filter(|m| m.fs_type == "btrfs").count(), 10);
}

#[test]
fn no_root_mount() {
    let table: String = MOUNTINFO.lines().skip(1).map(|l| format!("{l}\n")).collect();
    let err = find_root_subvolume_id(table.as_bytes()).unwrap_err();
    assert!(matches!(err, SnapError::AmbiguousRootMount { count: 0 }));
}

#[test]
fn duplicate_root_mount() {
    let first = MOUNTINFO.lines().next().unwrap();
    let table = format!("{MOUNTINFO}{first}\n");
    let err = find_root_subvolume_id(table.as_bytes()).unwrap_err();
    assert!(matches!(err, SnapError::AmbiguousRootMount { count: 2 }));
}

#[test]
fn finds_root_subvolume_from_file() {
    let id = find_root_subvolume_id_from(Path::new(MOUNTINFO_FIXTURE)).unwrap();
    assert_eq!(id, 269);
}

#[test]
fn missing_mount_table_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = find_root_subvolume_id_from(&dir.path().join("mountinfo")).unwrap_err();
    assert!(matches!(err, SnapError::Io(_)));
}

#[test]
fn live_mount_table() {
    // The outcome depends on the host; both readers must agree on it.
    let live = current_root_subvolume_id().ok();
    let from_file = find_root_subvolume_id_from(Path::new(MOUNTINFO_PATH)).ok();
    assert_eq!(live, from_file);
}
