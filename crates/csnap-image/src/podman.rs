use std::ffi::OsStr;
use std::path::PathBuf;

use csnap_common::paths::STORAGE_DRIVER;
use csnap_common::{SnapError, SnapPaths, SnapResult};

/// `podman` pointed at the snapshot store's graph root.
#[derive(Debug, Clone)]
pub struct Podman {
    /// The `podman` executable.
    program: PathBuf,
    /// Store layout.
    paths: SnapPaths,
}

impl Podman {
    /// Create a runner for the given executable and store.
    pub fn new(program: impl Into<PathBuf>, paths: SnapPaths) -> Self {
        Self {
            program: program.into(),
            paths,
        }
    }

    /// Store layout this runner operates on.
    pub fn paths(&self) -> &SnapPaths {
        &self.paths
    }

    /// Global options selecting the snapshot store.
    fn store_args(&self) -> [&OsStr; 6] {
        [
            OsStr::new("--root"),
            self.paths.graph_root.as_os_str(),
            OsStr::new("--runroot"),
            self.paths.run_root.as_os_str(),
            OsStr::new("--storage-driver"),
            OsStr::new(STORAGE_DRIVER),
        ]
    }

    /// A blocking command with the store options applied.
    pub fn command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(self.store_args());
        cmd
    }

    /// An async command with the store options applied.
    pub fn async_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.store_args());
        cmd
    }

    /// Run a blocking command and return its stdout.
    pub fn run(&self, operation: &str, cmd: &mut std::process::Command) -> SnapResult<String> {
        tracing::debug!(operation, command = ?cmd, "Running podman");

        let output = cmd.output().map_err(|e| self.spawn_error(operation, &e))?;
        Self::check(operation, &output)
    }

    /// Run an async command and return its stdout.
    pub async fn run_async(
        &self,
        operation: &str,
        cmd: &mut tokio::process::Command,
    ) -> SnapResult<String> {
        tracing::debug!(operation, command = ?cmd, "Running podman");

        let output = cmd
            .output()
            .await
            .map_err(|e| self.spawn_error(operation, &e))?;
        Self::check(operation, &output)
    }

    pub(crate) fn spawn_error(&self, operation: &str, err: &std::io::Error) -> SnapError {
        SnapError::primitive(
            operation,
            format!("failed to execute {}: {err}", self.program.display()),
        )
    }

    fn check(operation: &str, output: &std::process::Output) -> SnapResult<String> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SnapError::primitive(
                operation,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
