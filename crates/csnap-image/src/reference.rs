//! Image reference parsing.

use std::fmt;
use std::str::FromStr;

use csnap_common::{SnapError, SnapResult};

/// Transport used when a reference does not name one.
pub const DEFAULT_TRANSPORT: &str = "docker";

/// Prefix `reference` with the default transport unless it carries one.
///
/// Examples:
/// - `alpine` -> `docker://alpine`
/// - `docker://alpine` -> `docker://alpine`
/// - `oci-archive:///tmp/image.tar` -> unchanged
#[must_use]
pub fn normalize_reference(reference: &str) -> String {
    let reference = reference.trim();
    if reference.contains("://") {
        reference.to_string()
    } else {
        format!("{DEFAULT_TRANSPORT}://{reference}")
    }
}

/// A parsed registry image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname.
    pub registry: String,
    /// Repository name.
    pub repository: String,
    /// Tag or digest.
    pub reference: ImageTag,
}

/// Image tag or digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTag {
    /// A tag (e.g., "latest").
    Tag(String),
    /// A digest (e.g., "sha256:abc123...").
    Digest(String),
}

impl ImageReference {
    /// Default registry.
    pub const DEFAULT_REGISTRY: &'static str = "docker.io";
    /// Default tag.
    pub const DEFAULT_TAG: &'static str = "latest";

    /// Parse an image reference string, ignoring a `docker://` transport.
    ///
    /// Examples:
    /// - `alpine` -> docker.io/library/alpine:latest
    /// - `docker://alpine:3.19` -> docker.io/library/alpine:3.19
    /// - `registry.opensuse.org/opensuse/tumbleweed` -> registry.opensuse.org/opensuse/tumbleweed:latest
    pub fn parse(reference: &str) -> SnapResult<Self> {
        let reference = reference.trim();
        let reference = reference
            .strip_prefix(&format!("{DEFAULT_TRANSPORT}://"))
            .unwrap_or(reference);

        if reference.is_empty() || reference.contains("://") {
            return Err(SnapError::Config {
                message: format!("not a registry image reference: '{reference}'"),
            });
        }

        let (name, tag) = if let Some((name, digest)) = reference.split_once('@') {
            (name, ImageTag::Digest(digest.to_string()))
        } else if let Some(idx) = reference.rfind(':') {
            // registry:port/image carries no tag
            let potential_tag = &reference[idx + 1..];
            if potential_tag.contains('/') {
                (reference, ImageTag::Tag(Self::DEFAULT_TAG.to_string()))
            } else {
                (&reference[..idx], ImageTag::Tag(potential_tag.to_string()))
            }
        } else {
            (reference, ImageTag::Tag(Self::DEFAULT_TAG.to_string()))
        };

        let (registry, repository) = match name.split_once('/') {
            Some((host, rest))
                if host.contains('.') || host.contains(':') || host == "localhost" =>
            {
                (host.to_string(), rest.to_string())
            }
            Some(_) => (Self::DEFAULT_REGISTRY.to_string(), name.to_string()),
            None => (
                Self::DEFAULT_REGISTRY.to_string(),
                format!("library/{name}"),
            ),
        };

        Ok(Self {
            registry,
            repository,
            reference: tag,
        })
    }

    /// Get the full reference string.
    #[must_use]
    pub fn full_reference(&self) -> String {
        let tag = match &self.reference {
            ImageTag::Tag(t) => format!(":{t}"),
            ImageTag::Digest(d) => format!("@{d}"),
        };
        format!("{}/{}{}", self.registry, self.repository, tag)
    }

    /// Whether two reference strings name the same image.
    ///
    /// Falls back to plain string equality when either side does not parse.
    #[must_use]
    pub fn same_image(a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        match (Self::parse(a), Self::parse(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl FromStr for ImageReference {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize() {
        assert_eq!(normalize_reference("alpine"), "docker://alpine");
        assert_eq!(
            normalize_reference("docker://registry.opensuse.org/opensuse/tumbleweed"),
            "docker://registry.opensuse.org/opensuse/tumbleweed"
        );
        assert_eq!(
            normalize_reference("oci-archive:///tmp/image.tar"),
            "oci-archive:///tmp/image.tar"
        );
    }

    #[test]
    fn parse_simple() {
        let ref_ = ImageReference::parse("alpine").unwrap();
        assert_eq!(ref_.registry, "docker.io");
        assert_eq!(ref_.repository, "library/alpine");
        assert_eq!(ref_.reference, ImageTag::Tag("latest".to_string()));
    }

    #[test]
    fn parse_with_transport() {
        let ref_ = ImageReference::parse("docker://alpine:3.19").unwrap();
        assert_eq!(ref_.full_reference(), "docker.io/library/alpine:3.19");
    }

    #[test]
    fn parse_custom_registry() {
        let ref_ = ImageReference::parse("registry.opensuse.org/opensuse/tumbleweed").unwrap();
        assert_eq!(ref_.registry, "registry.opensuse.org");
        assert_eq!(ref_.repository, "opensuse/tumbleweed");
    }

    #[test]
    fn parse_registry_port() {
        let ref_ = ImageReference::parse("localhost:5000/app").unwrap();
        assert_eq!(ref_.registry, "localhost:5000");
        assert_eq!(ref_.repository, "app");
        assert_eq!(ref_.reference, ImageTag::Tag("latest".to_string()));
    }

    #[test]
    fn parse_digest() {
        let ref_ = ImageReference::parse("alpine@sha256:abc").unwrap();
        assert_eq!(ref_.full_reference(), "docker.io/library/alpine@sha256:abc");
    }

    #[test]
    fn other_transport_rejected() {
        assert!(ImageReference::parse("oci-archive:///tmp/image.tar").is_err());
    }

    #[test]
    fn same_image() {
        assert!(ImageReference::same_image(
            "alpine",
            "docker.io/library/alpine:latest"
        ));
        assert!(!ImageReference::same_image("alpine", "alpine:3.19"));
    }
}
