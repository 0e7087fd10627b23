use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;

use csnap_common::{SnapError, SnapResult};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use crate::podman::Podman;
use crate::reference::normalize_reference;

/// When to contact the registry on pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PullPolicy {
    /// Always pull, even if the image is present.
    #[default]
    Always,
    /// Pull only if the image is missing.
    Missing,
    /// Pull if the registry has a newer image.
    Newer,
    /// Never pull; fail if the image is missing.
    Never,
}

impl PullPolicy {
    /// The policy name understood by the image tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Missing => "missing",
            Self::Newer => "newer",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PullPolicy {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "missing" => Ok(Self::Missing),
            "newer" => Ok(Self::Newer),
            "never" => Ok(Self::Never),
            other => Err(SnapError::Config {
                message: format!("unknown pull policy '{other}'"),
            }),
        }
    }
}

/// A progress event emitted while pulling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullProgress {
    /// A layer blob is being fetched or has been fetched.
    Blob {
        /// Blob digest.
        digest: String,
        /// Whether the blob is complete.
        done: bool,
    },
    /// The image config is being copied.
    Config {
        /// Config digest.
        digest: String,
    },
    /// Any other status line.
    Status(String),
}

impl PullProgress {
    /// Interpret one progress line of the image tool.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(rest) = line.strip_prefix("Copying blob ") {
            let mut parts = rest.split_whitespace();
            let digest = parts.next()?.to_string();
            let done = parts.any(|w| matches!(w, "done" | "skipped:"));
            return Some(Self::Blob { digest, done });
        }
        if let Some(rest) = line.strip_prefix("Copying config ") {
            let digest = rest.split_whitespace().next()?.to_string();
            return Some(Self::Config { digest });
        }
        Some(Self::Status(line.to_string()))
    }
}

impl fmt::Display for PullProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob { digest, done: true } => write!(f, "Pulled layer {digest}"),
            Self::Blob { digest, done: false } => write!(f, "Pulling layer {digest}"),
            Self::Config { digest } => write!(f, "Copying config {digest}"),
            Self::Status(line) => f.write_str(line),
        }
    }
}

/// Pulls and loads images into the snapshot store.
#[derive(Debug, Clone)]
pub struct Puller {
    podman: Podman,
}

impl Puller {
    /// Create a puller operating through `podman`.
    pub fn new(podman: Podman) -> Self {
        Self { podman }
    }

    /// Pull `reference` and return the IDs of the pulled images.
    ///
    /// Progress is forwarded to `progress` while the pull runs. A dropped
    /// receiver does not abort the pull.
    pub async fn pull(
        &self,
        reference: &str,
        policy: PullPolicy,
        progress: UnboundedSender<PullProgress>,
    ) -> SnapResult<Vec<String>> {
        const OPERATION: &str = "podman pull";

        let reference = normalize_reference(reference);
        tracing::info!(reference = %reference, %policy, "Pulling image");

        let mut child = self
            .podman
            .async_command()
            .args(["pull", "--policy", policy.as_str()])
            .arg(&reference)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.podman.spawn_error(OPERATION, &e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SnapError::primitive(OPERATION, "stderr not captured"))?;

        let forwarder = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut transcript = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(event) = PullProgress::parse(&line) {
                    // receiver gone: keep draining so the child never blocks
                    let _ = progress.send(event);
                }
                transcript.push(line);
            }
            transcript
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.podman.spawn_error(OPERATION, &e))?;
        let transcript = forwarder.await.unwrap_or_default();

        if !output.status.success() {
            return Err(SnapError::primitive(
                OPERATION,
                format!("{} ({})", transcript.join("\n").trim(), output.status),
            ));
        }

        let ids = parse_image_ids(&String::from_utf8_lossy(&output.stdout));
        if ids.len() != 1 {
            tracing::warn!(count = ids.len(), "Expected to pull exactly one image");
        }
        for id in &ids {
            tracing::info!(id = %id, "Pulled image");
        }
        Ok(ids)
    }

    /// Load an image archive into the store, returning the loaded names.
    pub async fn load(&self, archive: &Path) -> SnapResult<Vec<String>> {
        tracing::info!(archive = %archive.display(), "Loading image archive");

        let output = self
            .podman
            .run_async(
                "podman load",
                self.podman
                    .async_command()
                    .args(["load", "--input"])
                    .arg(archive)
                    .stdin(Stdio::null()),
            )
            .await?;

        Ok(parse_loaded_names(&output))
    }
}

/// One image ID per non-empty output line.
fn parse_image_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Names from `Loaded image: <name>` / `Loaded image(s): <a>,<b>` lines.
fn parse_loaded_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|l| l.split_once(": "))
        .filter(|(prefix, _)| prefix.trim_start().starts_with("Loaded image"))
        .flat_map(|(_, names)| names.split(','))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}
