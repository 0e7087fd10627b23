//! Common error types for container-snap.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`SnapError`].
pub type SnapResult<T> = Result<T, SnapError>;

/// Errors raised while resolving or manipulating snapshots.
#[derive(Error, Diagnostic, Debug)]
pub enum SnapError {
    /// Snapshot ID does not match `<image>` or `<image>-work<N>`.
    #[error("Malformed snapshot ID: {id}")]
    #[diagnostic(
        code(csnap::id::malformed),
        help("Snapshot IDs have the form '<image-id>' or '<image-id>-work<N>'")
    )]
    MalformedId {
        /// The rejected ID.
        id: String,
    },

    /// The `work<N>` suffix does not carry a valid number.
    #[error("Malformed snapshot number '{number}' in snapshot ID {id}")]
    #[diagnostic(
        code(csnap::id::malformed_number),
        help("The number after '-work' must be a non-negative decimal integer")
    )]
    MalformedNumber {
        /// The rejected ID.
        id: String,
        /// The offending number text.
        number: String,
    },

    /// The mount table does not contain exactly one mount on `/`.
    #[error("Did not find a unique root mount ({count} entries for '/')")]
    #[diagnostic(code(csnap::mount::ambiguous_root))]
    AmbiguousRootMount {
        /// Number of entries mounted on `/`.
        count: usize,
    },

    /// The root mount lacks `subvolid=` or `subvol=` options.
    #[error("Could not infer default subvolume from mount options: {options}")]
    #[diagnostic(
        code(csnap::mount::missing_subvolume),
        help("Is the root filesystem a btrfs subvolume?")
    )]
    MissingSubvolumeInfo {
        /// The superblock options of the root mount.
        options: String,
    },

    /// The `subvolid=` option is not an unsigned integer.
    #[error("Invalid subvolume ID: {value}")]
    #[diagnostic(code(csnap::mount::invalid_subvolume_id))]
    InvalidSubvolumeId {
        /// The unparsable value.
        value: String,
    },

    /// A mount table line could not be parsed.
    #[error("Malformed mountinfo line: {line}")]
    #[diagnostic(code(csnap::mount::malformed))]
    MalformedMountInfo {
        /// The offending line.
        line: String,
    },

    /// Image not present in the image store.
    #[error("No image with id '{id}' found in image store")]
    #[diagnostic(code(csnap::image::not_found))]
    ImageNotFound {
        /// The image ID that was not found.
        id: String,
    },

    /// No known snapshot lives in the given subvolume.
    #[error("No matching snapshot with subvolume ID {subvolume_id} found")]
    #[diagnostic(code(csnap::snapshot::not_found))]
    SnapshotNotFound {
        /// The btrfs subvolume ID.
        subvolume_id: u64,
    },

    /// Subvolume does not exist.
    #[error("Subvolume not found: {path}")]
    #[diagnostic(code(csnap::subvolume::not_found))]
    SubvolumeNotFound {
        /// Path of the missing subvolume.
        path: String,
    },

    /// Snapshot source does not exist.
    #[error("Snapshot source does not exist: {path}")]
    #[diagnostic(code(csnap::snapshot::source_not_found))]
    SourceNotFound {
        /// The source subvolume path.
        path: String,
    },

    /// Snapshot destination is already occupied.
    #[error("Snapshot destination already exists: {path}")]
    #[diagnostic(
        code(csnap::snapshot::destination_exists),
        help("Create the snapshot from the highest existing snapshot of the image")
    )]
    DestinationExists {
        /// The destination subvolume path.
        path: String,
    },

    /// An underlying filesystem or image store tool failed.
    #[error("{operation} failed: {message}")]
    #[diagnostic(code(csnap::primitive))]
    Primitive {
        /// The primitive that was invoked.
        operation: String,
        /// What the tool reported.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(csnap::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(csnap::serialization))]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(csnap::config))]
    Config {
        /// The error message.
        message: String,
    },
}

impl SnapError {
    /// Build a [`SnapError::Primitive`] from an operation name and a message.
    pub fn primitive(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Primitive {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the referenced object does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ImageNotFound { .. }
                | Self::SnapshotNotFound { .. }
                | Self::SubvolumeNotFound { .. }
                | Self::SourceNotFound { .. }
        )
    }
}

impl From<serde_json::Error> for SnapError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
