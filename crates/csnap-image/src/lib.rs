//! # csnap-image
//!
//! Container image store access for container-snap.
//!
//! This crate provides:
//! - The [`ImageStore`] capability consumed by the snapshot core
//! - [`ContainersStorage`], backed by a containers-storage btrfs graph root
//! - Image reference normalisation
//! - Pulling and loading images with progress reporting

#![warn(missing_docs)]

/// Invocation of the `podman` tool against the snapshot store.
pub mod podman;
/// Image pulling and loading.
pub mod pull;
pub mod reference;
/// Image store capability and its containers-storage implementation.
pub mod store;

pub use podman::Podman;
pub use pull::{PullPolicy, PullProgress, Puller};
pub use reference::{ImageReference, normalize_reference};
pub use store::{ContainersStorage, Image, ImageStore};
