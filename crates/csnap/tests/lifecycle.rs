mod common;

use std::path::{Path, PathBuf};

use common::{FakeFilesystem, FakeImageStore, GRAPH_ROOT, image};
use csnap::{ContainerSnap, Snapshot, SnapshotId};
use csnap_common::SnapError;

fn subvolumes() -> String {
    format!("{GRAPH_ROOT}/btrfs/subvolumes")
}

fn snap() -> ContainerSnap<FakeImageStore, FakeFilesystem> {
    let images = FakeImageStore::new(vec![
        image(
            "a1b2",
            "badbf160",
            &[
                "registry.opensuse.org/opensuse/tumbleweed:latest",
                "localhost/tw:1",
            ],
        ),
        image("c3d4", "0fe1c2", &["registry.opensuse.org/opensuse/tumbleweed:latest"]),
        image("e5f6", "77aa00", &["docker.io/library/alpine:3.20"]),
    ]);
    ContainerSnap::new(images, FakeFilesystem::default())
}

#[test]
fn mounted_image_dir() {
    let snap = snap();
    assert_eq!(
        snap.mounted_image_dir(&SnapshotId::from("a1b2")).unwrap(),
        format!("{}/badbf160/", subvolumes())
    );
    assert_eq!(
        snap.mounted_image_dir(&SnapshotId::from("a1b2-work2")).unwrap(),
        format!("{}/badbf160-work2/", subvolumes())
    );
}

#[test]
fn mounted_image_dir_errors() {
    let snap = snap();
    assert!(matches!(
        snap.mounted_image_dir(&SnapshotId::from("a1b2-foo")),
        Err(SnapError::MalformedId { .. })
    ));
    assert!(matches!(
        snap.mounted_image_dir(&SnapshotId::from("a1b2-workx")),
        Err(SnapError::MalformedNumber { .. })
    ));
    assert!(matches!(
        snap.mounted_image_dir(&SnapshotId::from("ffff")),
        Err(SnapError::ImageNotFound { .. })
    ));
}

#[test_log::test]
fn create_snapshot_numbers_from_base() {
    let snap = snap();
    let next = snap.create_snapshot(&SnapshotId::from("a1b2-work2")).unwrap();
    assert_eq!(next, Snapshot::new("a1b2", 3));

    let calls = snap.filesystem().snapshots.borrow();
    assert_eq!(
        *calls,
        vec![(
            PathBuf::from(format!("{}/badbf160-work2/", subvolumes())),
            PathBuf::from(format!("{}/badbf160-work3/", subvolumes())),
        )]
    );
}

#[test]
fn create_snapshot_of_image() {
    let snap = snap();
    let next = snap.create_snapshot(&SnapshotId::from("e5f6")).unwrap();
    assert_eq!(next.id(), SnapshotId::from("e5f6-work1"));
}

#[test]
fn create_snapshot_overflow() {
    let snap = snap();
    let id = SnapshotId::new(format!("a1b2-work{}", u64::MAX));
    assert!(matches!(
        snap.create_snapshot(&id),
        Err(SnapError::MalformedNumber { .. })
    ));
    assert!(snap.filesystem().snapshots.borrow().is_empty());
}

#[test]
fn delete_base_deletes_image() {
    let snap = snap();
    snap.delete_snapshot(&SnapshotId::from("e5f6")).unwrap();

    assert_eq!(*snap.images().deleted.borrow(), vec!["e5f6".to_string()]);
    assert!(snap.filesystem().deleted.borrow().is_empty());
}

#[test]
fn delete_snapshot_without_trailing_separator() {
    let snap = snap();
    snap.delete_snapshot(&SnapshotId::from("a1b2-work4")).unwrap();

    let deleted = snap.filesystem().deleted.borrow();
    assert_eq!(deleted.len(), 1);
    let expected = format!("{}/badbf160-work4", subvolumes());
    assert_eq!(deleted[0].to_str(), Some(expected.as_str()));
    assert!(snap.images().deleted.borrow().is_empty());
}

#[test]
fn delete_images_named() {
    let snap = snap();
    let deleted = snap
        .delete_images_named("registry.opensuse.org/opensuse/tumbleweed")
        .unwrap();
    assert_eq!(deleted, vec!["a1b2".to_string(), "c3d4".to_string()]);
    assert_eq!(snap.images().images.borrow().len(), 1);

    assert!(matches!(
        snap.delete_images_named("registry.opensuse.org/opensuse/leap:15.6"),
        Err(SnapError::ImageNotFound { .. })
    ));
}

#[test]
fn switch_to_snapshot() {
    let snap = snap();
    snap.switch_to_snapshot(&SnapshotId::from("a1b2-work1"))
        .unwrap();

    let defaults = snap.filesystem().defaults_set.borrow();
    assert_eq!(defaults.len(), 1);
    assert_eq!(
        defaults[0],
        Path::new(&subvolumes()).join("badbf160-work1")
    );
}

#[test]
fn readonly_state() {
    let snap = snap();
    let id = SnapshotId::from("a1b2-work1");

    assert!(!snap.get_readonly(&id).unwrap());
    snap.set_readonly(&id, true).unwrap();
    assert!(snap.get_readonly(&id).unwrap());
    snap.set_readonly(&id, false).unwrap();
    assert!(!snap.get_readonly(&id).unwrap());
}
