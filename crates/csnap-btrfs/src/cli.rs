//! [`SnapshotFilesystem`] backed by the `btrfs` command line tool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use csnap_common::{SnapError, SnapResult};

use crate::output::{parse_default_subvolume, parse_readonly_property, parse_subvolume_list};
use crate::subvolume::{SnapshotFilesystem, SubvolumeInfo};

/// Drives `btrfs` subcommands.
#[derive(Debug, Clone)]
pub struct BtrfsCli {
    /// The `btrfs` executable.
    program: PathBuf,
}

impl BtrfsCli {
    /// Create a backend invoking the given executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }

    /// Run a prepared command and return its stdout.
    fn run(&self, operation: &str, cmd: &mut Command) -> SnapResult<String> {
        tracing::debug!(operation, command = ?cmd, "Running btrfs");

        let output = cmd.output().map_err(|e| {
            SnapError::primitive(
                operation,
                format!("failed to execute {}: {e}", self.program.display()),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SnapError::primitive(
                operation,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn require_subvolume(path: &Path) -> SnapResult<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(SnapError::SubvolumeNotFound {
                path: path.display().to_string(),
            })
        }
    }
}

impl Default for BtrfsCli {
    fn default() -> Self {
        Self::new("btrfs")
    }
}

impl SnapshotFilesystem for BtrfsCli {
    fn list_subvolumes(&self, path: &Path) -> SnapResult<Vec<SubvolumeInfo>> {
        let all = self.run(
            "btrfs subvolume list",
            self.command().args(["subvolume", "list", "-a"]).arg(path),
        )?;
        let readonly = self.run(
            "btrfs subvolume list",
            self.command().args(["subvolume", "list", "-a", "-r"]).arg(path),
        )?;

        let readonly: HashSet<u64> = parse_subvolume_list(&readonly)?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let mut subvolumes = parse_subvolume_list(&all)?;
        for subvolume in &mut subvolumes {
            subvolume.readonly = readonly.contains(&subvolume.id);
        }

        tracing::debug!(
            path = %path.display(),
            count = subvolumes.len(),
            "Listed subvolumes"
        );
        Ok(subvolumes)
    }

    fn create_snapshot(&self, source: &Path, dest: &Path) -> SnapResult<()> {
        if !source.exists() {
            return Err(SnapError::SourceNotFound {
                path: source.display().to_string(),
            });
        }
        if dest.exists() {
            return Err(SnapError::DestinationExists {
                path: dest.display().to_string(),
            });
        }

        self.run(
            "btrfs subvolume snapshot",
            self.command()
                .args(["subvolume", "snapshot"])
                .arg(source)
                .arg(dest),
        )?;

        tracing::info!(
            source = %source.display(),
            dest = %dest.display(),
            "Snapshot created"
        );
        Ok(())
    }

    fn delete_subvolume(&self, path: &Path) -> SnapResult<()> {
        Self::require_subvolume(path)?;

        self.run(
            "btrfs subvolume delete",
            self.command().args(["subvolume", "delete"]).arg(path),
        )?;

        tracing::info!(path = %path.display(), "Subvolume deleted");
        Ok(())
    }

    fn get_readonly(&self, path: &Path) -> SnapResult<bool> {
        Self::require_subvolume(path)?;

        let output = self.run(
            "btrfs property get",
            self.command()
                .args(["property", "get", "-ts"])
                .arg(path)
                .arg("ro"),
        )?;
        parse_readonly_property(&output)
    }

    fn set_readonly(&self, path: &Path, readonly: bool) -> SnapResult<()> {
        Self::require_subvolume(path)?;

        let state = if readonly { "true" } else { "false" };
        self.run(
            "btrfs property set",
            self.command()
                .args(["property", "set", "-ts"])
                .arg(path)
                .args(["ro", state]),
        )?;

        tracing::info!(path = %path.display(), readonly, "Read-only state changed");
        Ok(())
    }

    fn get_default_subvolume(&self, mountpoint: &Path) -> SnapResult<u64> {
        let output = self.run(
            "btrfs subvolume get-default",
            self.command()
                .args(["subvolume", "get-default"])
                .arg(mountpoint),
        )?;
        parse_default_subvolume(&output)
    }

    fn set_default_subvolume(&self, path: &Path) -> SnapResult<()> {
        Self::require_subvolume(path)?;

        self.run(
            "btrfs subvolume set-default",
            self.command().args(["subvolume", "set-default"]).arg(path),
        )?;

        tracing::info!(path = %path.display(), "Default subvolume changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source() {
        let temp = tempfile::tempdir().unwrap();
        let btrfs = BtrfsCli::default();

        let err = btrfs
            .create_snapshot(&temp.path().join("missing"), &temp.path().join("dest"))
            .unwrap_err();
        assert!(matches!(err, SnapError::SourceNotFound { .. }));
    }

    #[test]
    fn existing_destination() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("base");
        let dest = temp.path().join("base-work1");
        std::fs::create_dir(&source).unwrap();
        std::fs::create_dir(&dest).unwrap();

        let err = BtrfsCli::default()
            .create_snapshot(&source, &dest)
            .unwrap_err();
        assert!(matches!(err, SnapError::DestinationExists { .. }));
    }

    #[test]
    fn missing_subvolume() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("gone");
        let btrfs = BtrfsCli::default();

        assert!(matches!(
            btrfs.delete_subvolume(&path).unwrap_err(),
            SnapError::SubvolumeNotFound { .. }
        ));
        assert!(matches!(
            btrfs.set_default_subvolume(&path).unwrap_err(),
            SnapError::SubvolumeNotFound { .. }
        ));
    }

    #[test]
    fn missing_program() {
        let temp = tempfile::tempdir().unwrap();
        let btrfs = BtrfsCli::new(temp.path().join("no-such-btrfs"));

        let err = btrfs.get_default_subvolume(Path::new("/")).unwrap_err();
        assert!(matches!(err, SnapError::Primitive { .. }));
    }
}
