//! Rendering of listings.

use chrono::SecondsFormat;
use clap::ValueEnum;
use csnap_image::Image;
use serde::Serialize;

use crate::manager::ContainerSnapshot;
use crate::snapshot::SnapshotId;

/// Listing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma separated values, one record per line.
    #[default]
    Csv,
    /// A JSON array.
    Json,
}

#[derive(Serialize)]
struct ImageRow<'a> {
    id: &'a str,
    created: Option<String>,
    name: &'a str,
    top_layer: &'a str,
}

#[derive(Serialize)]
struct SnapshotRow<'a> {
    id: SnapshotId,
    image_id: &'a str,
    number: u64,
    top_layer: &'a str,
    subvolume_id: u64,
    readonly: bool,
}

fn created(image: &Image) -> Option<String> {
    image
        .created
        .map(|c| c.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Render images as `id,created,name` lines or JSON.
pub fn render_images(images: &[Image], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Csv => Ok(images
            .iter()
            .map(|img| {
                format!(
                    "{},{},{}\n",
                    img.id,
                    created(img).unwrap_or_default(),
                    img.display_name()
                )
            })
            .collect()),
        OutputFormat::Json => {
            let rows: Vec<ImageRow<'_>> = images
                .iter()
                .map(|img| ImageRow {
                    id: &img.id,
                    created: created(img),
                    name: img.display_name(),
                    top_layer: &img.top_layer,
                })
                .collect();
            Ok(serde_json::to_string_pretty(&rows)? + "\n")
        }
    }
}

/// Render snapshots as a `# snapshot-id,ro` table or JSON.
pub fn render_snapshots(
    snapshots: &[ContainerSnapshot],
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Csv => {
            let mut out = String::from("# snapshot-id,ro\n");
            for snapshot in snapshots {
                out.push_str(&format!("{},{}\n", snapshot.id(), snapshot.readonly));
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let rows: Vec<SnapshotRow<'_>> = snapshots
                .iter()
                .map(|s| SnapshotRow {
                    id: s.id(),
                    image_id: &s.snapshot.image_id,
                    number: s.snapshot.number,
                    top_layer: &s.top_layer,
                    subvolume_id: s.subvolume_id,
                    readonly: s.readonly,
                })
                .collect();
            Ok(serde_json::to_string_pretty(&rows)? + "\n")
        }
    }
}
