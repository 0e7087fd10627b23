//! CLI command definitions and handlers.

mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use csnap_btrfs::BtrfsCli;
use csnap_common::SnapPaths;
use csnap_image::{ContainersStorage, ImageStore, Podman, PullPolicy, PullProgress, Puller};
use indicatif::{ProgressBar, ProgressDrawTarget};
use tokio::sync::mpsc;

use crate::manager::ContainerSnap;
use crate::snapshot::SnapshotId;

pub use output::{OutputFormat, render_images, render_snapshots};

/// container-snap - OCI image based snapshot creation utility
#[derive(Parser)]
#[command(name = "container-snap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Root directory for container-snap data [default: /var/lib/container-snap]
    #[arg(long, global = true, env = "CONTAINER_SNAP_ROOT")]
    pub root: Option<PathBuf>,

    /// The btrfs executable
    #[arg(long, global = true, default_value = "btrfs")]
    pub btrfs: PathBuf,

    /// The podman executable
    #[arg(long, global = true, default_value = "podman")]
    pub podman: PathBuf,

    /// Mount table used to find the booted snapshot [default: /proc/thread-self/mountinfo]
    #[arg(long, global = true)]
    pub mountinfo: Option<PathBuf>,

    /// Path below which subvolumes are listed
    #[arg(long, global = true, default_value = "/")]
    pub subvolume_root: PathBuf,

    /// Mount point whose default subvolume is queried and set
    #[arg(long, global = true, default_value = "/")]
    pub mountpoint: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// container-snap commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Pull the supplied image
    Pull {
        /// Image reference, `docker://` is assumed without a transport
        url: String,

        /// When to contact the registry
        #[arg(long, default_value_t = PullPolicy::Always)]
        policy: PullPolicy,
    },

    /// Load an image from a reference or an archive
    #[command(group(ArgGroup::new("source").required(true).args(["url", "input"])))]
    Load {
        /// Image reference to fetch
        url: Option<String>,

        /// Image archive to read
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Switches the current default snapshot to the new one
    Switch {
        /// Snapshot ID
        id: String,
    },

    /// Print the root directory of the image from the given ID
    GetRoot {
        /// Snapshot ID
        id: String,
    },

    /// Set the snapshot with the given ID to read-only or read-write
    SetReadonlyState {
        /// Snapshot ID
        id: String,

        /// Make the snapshot read-only
        #[arg(long, overrides_with = "no_readonly")]
        readonly: bool,

        /// Make the snapshot writable
        #[arg(long, overrides_with = "readonly")]
        no_readonly: bool,
    },

    /// Get the read-only state of the snapshot with the given ID
    GetReadonlyState {
        /// Snapshot ID
        id: String,
    },

    /// Lists all container images in the storage
    ListImages {
        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List all snapshots known to container-snap
    ListSnapshots {
        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Print the default snapshot
    GetDefault,

    /// Print the currently active snapshot (the one the OS has been booted from)
    GetCurrent,

    /// Delete an image by url or a snapshot by ID
    #[command(group(ArgGroup::new("target").required(true).args(["url", "id"])))]
    Delete {
        /// Image url to delete
        #[arg(long)]
        url: Option<String>,

        /// Snapshot ID to delete
        #[arg(long)]
        id: Option<String>,
    },

    /// Creates a snapshot based on the provided ID and prints the new ID
    CreateSnapshot {
        /// Snapshot ID to base the new snapshot on
        id: String,
    },
}

impl Cli {
    /// Store layout selected on the command line.
    #[must_use]
    pub fn paths(&self) -> SnapPaths {
        self.root
            .as_ref()
            .map_or_else(SnapPaths::default, SnapPaths::with_root)
    }

    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let paths = self.paths();
        let podman = Podman::new(&self.podman, paths);
        let snap = ContainerSnap::new(
            ContainersStorage::new(podman.clone()),
            BtrfsCli::new(&self.btrfs),
        )
        .with_subvolume_root(&self.subvolume_root)
        .with_mountpoint(&self.mountpoint);

        match self.command {
            Commands::Pull { url, policy } => {
                let ids = pull(&Puller::new(podman), &url, policy).await?;
                report_pulled(&snap, &ids)?;
                Ok(())
            }

            Commands::Load { url, input } => {
                let puller = Puller::new(podman);
                if let Some(archive) = input {
                    let names = puller
                        .load(&archive)
                        .await
                        .wrap_err_with(|| format!("Failed to load {}", archive.display()))?;
                    for name in names {
                        println!("{name}");
                    }
                } else if let Some(url) = url {
                    let ids = pull(&puller, &url, PullPolicy::Always).await?;
                    report_pulled(&snap, &ids)?;
                }
                Ok(())
            }

            Commands::Switch { id } => {
                let id = SnapshotId::from(id);
                snap.switch_to_snapshot(&id)
                    .wrap_err_with(|| format!("Failed to switch to snapshot {id}"))?;
                Ok(())
            }

            Commands::GetRoot { id } => {
                let id = SnapshotId::from(id);
                let root = snap
                    .mounted_image_dir(&id)
                    .wrap_err_with(|| format!("Failed to resolve snapshot {id}"))?;
                println!("{root}");
                Ok(())
            }

            Commands::SetReadonlyState { id, readonly, .. } => {
                let id = SnapshotId::from(id);
                snap.set_readonly(&id, readonly)
                    .wrap_err_with(|| format!("Failed to set read-only state of {id}"))?;
                Ok(())
            }

            Commands::GetReadonlyState { id } => {
                let id = SnapshotId::from(id);
                let readonly = snap
                    .get_readonly(&id)
                    .wrap_err_with(|| format!("Failed to get read-only state of {id}"))?;
                println!("{readonly}");
                Ok(())
            }

            Commands::ListImages { format } => {
                let images = snap
                    .images()
                    .list_images()
                    .wrap_err("Failed to list images")?;
                print!("{}", render_images(&images, format)?);
                Ok(())
            }

            Commands::ListSnapshots { format } => {
                let snapshots = snap.all_snapshots().wrap_err("Failed to list snapshots")?;
                print!("{}", render_snapshots(&snapshots, format)?);
                Ok(())
            }

            Commands::GetDefault => {
                let snapshot = snap
                    .default_snapshot()
                    .wrap_err("Failed to find the default snapshot")?;
                println!("{snapshot}");
                Ok(())
            }

            Commands::GetCurrent => {
                let snapshot = snap
                    .current_snapshot(self.mountinfo.as_deref())
                    .wrap_err("Failed to find the current snapshot")?;
                println!("{snapshot}");
                Ok(())
            }

            Commands::Delete { url, id } => {
                if let Some(url) = url {
                    let deleted = snap
                        .delete_images_named(&url)
                        .wrap_err_with(|| format!("Failed to delete image {url}"))?;
                    for id in deleted {
                        tracing::info!(id = %id, url = %url, "Deleted image");
                    }
                } else if let Some(id) = id {
                    let id = SnapshotId::from(id);
                    snap.delete_snapshot(&id)
                        .wrap_err_with(|| format!("Failed to delete snapshot {id}"))?;
                }
                Ok(())
            }

            Commands::CreateSnapshot { id } => {
                let id = SnapshotId::from(id);
                let snapshot = snap
                    .create_snapshot(&id)
                    .wrap_err_with(|| format!("Failed to create a snapshot of {id}"))?;
                println!("{snapshot}");
                Ok(())
            }
        }
    }
}

/// Pull with a spinner on stderr fed from the progress channel.
async fn pull(puller: &Puller, url: &str, policy: PullPolicy) -> Result<Vec<String>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<PullProgress>();

    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let reporter = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if matches!(event, PullProgress::Blob { done: true, .. }) {
                    spinner.println(event.to_string());
                } else {
                    spinner.set_message(event.to_string());
                }
            }
        })
    };

    let result = puller.pull(url, policy, tx).await;
    // the sender is gone once the pull returns, so the reporter drains and exits
    let _ = reporter.await;
    spinner.finish_and_clear();

    result.wrap_err_with(|| format!("Failed to pull {url}"))
}

fn report_pulled<I: ImageStore, F: csnap_btrfs::SnapshotFilesystem>(
    snap: &ContainerSnap<I, F>,
    ids: &[String],
) -> Result<()> {
    let images = snap
        .images()
        .find_images(ids)
        .wrap_err("Failed to look up pulled images")?;
    for image in images {
        tracing::debug!(id = %image.id, top_layer = %image.top_layer, "Resolved pulled image");
        println!("{}", image.id);
    }
    Ok(())
}
