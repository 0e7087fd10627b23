//! Snapshot identifiers.
//!
//! A [`SnapshotId`] is either `<image-id>` (the image itself, snapshot
//! number 0) or `<image-id>-work<N>`. The image ID ends at the first `-`,
//! so image IDs containing a dash cannot be expressed.
//!
//! `<image-id>-work0` is accepted and decodes to the base snapshot, whose
//! ID renders without suffix. Leading zeros (`-work03`) collapse the same way.

use std::fmt;
use std::str::FromStr;

use csnap_common::{SnapError, SnapResult};
use serde::{Deserialize, Serialize};

/// Marker between image ID and snapshot number.
pub const WORK_SEPARATOR: &str = "-work";

/// User-facing snapshot identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    /// Wrap an identifier without validating it.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SnapshotId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for SnapshotId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Structured form of a [`SnapshotId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snapshot {
    /// ID of the base image.
    pub image_id: String,
    /// Snapshot number, 0 for the image itself.
    pub number: u64,
}

impl Snapshot {
    /// Create a snapshot of `image_id`.
    pub fn new(image_id: impl Into<String>, number: u64) -> Self {
        Self {
            image_id: image_id.into(),
            number,
        }
    }

    /// The image itself.
    pub fn base(image_id: impl Into<String>) -> Self {
        Self::new(image_id, 0)
    }

    /// Whether this is the image itself rather than a derived snapshot.
    #[must_use]
    pub const fn is_base(&self) -> bool {
        self.number == 0
    }

    /// Decode a snapshot identifier.
    ///
    /// # Errors
    ///
    /// `MalformedId` if the part after the first `-` does not start with
    /// `work`, `MalformedNumber` if what follows is not a decimal number.
    pub fn parse(id: &str) -> SnapResult<Self> {
        let malformed = || SnapError::MalformedId { id: id.to_string() };

        let Some((image_id, tail)) = id.split_once('-') else {
            if id.is_empty() {
                return Err(malformed());
            }
            return Ok(Self::base(id));
        };
        if image_id.is_empty() {
            return Err(malformed());
        }

        let number = tail.strip_prefix("work").ok_or_else(malformed)?;
        let malformed_number = || SnapError::MalformedNumber {
            id: id.to_string(),
            number: number.to_string(),
        };
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed_number());
        }
        let number = number.parse::<u64>().map_err(|_| malformed_number())?;

        Ok(Self::new(image_id, number))
    }

    /// Encode this snapshot as its identifier.
    #[must_use]
    pub fn id(&self) -> SnapshotId {
        if self.is_base() {
            SnapshotId::new(self.image_id.clone())
        } else {
            SnapshotId(format!("{}{WORK_SEPARATOR}{}", self.image_id, self.number))
        }
    }

    /// The snapshot numbered one above this one.
    ///
    /// # Errors
    ///
    /// `MalformedNumber` if the number would overflow.
    pub fn next(&self) -> SnapResult<Self> {
        let number = self
            .number
            .checked_add(1)
            .ok_or_else(|| SnapError::MalformedNumber {
                id: self.id().to_string(),
                number: self.number.to_string(),
            })?;
        Ok(Self::new(self.image_id.clone(), number))
    }
}

impl FromStr for Snapshot {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&SnapshotId> for Snapshot {
    type Error = SnapError;

    fn try_from(id: &SnapshotId) -> Result<Self, Self::Error> {
        Self::parse(id.as_str())
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id().fmt(f)
    }
}
