//! # csnap-common
//!
//! Shared types for the container-snap crates.
//!
//! This crate provides:
//! - The common error type and result alias
//! - The on-disk layout of the snapshot store

#![warn(missing_docs)]

pub mod error;
pub mod paths;

pub use error::{SnapError, SnapResult};
pub use paths::SnapPaths;
