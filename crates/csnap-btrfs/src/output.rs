//! Parsers for `btrfs` tool output.

use csnap_common::{SnapError, SnapResult};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::subvolume::SubvolumeInfo;

// ID 272 gen 152 top level 257 path @/.snapshots/3/snapshot
static SUBVOLUME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^ID\s+([0-9]+)\s+gen\s+[0-9]+\s+(?:cgen\s+[0-9]+\s+)?top level\s+[0-9]+\s+(?:parent\s+[0-9]+\s+)?path\s+(.+)$",
    )
    .expect("subvolume list pattern is valid")
});

static DEFAULT_SUBVOLUME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ID\s+([0-9]+)").expect("get-default pattern is valid"));

/// Parse the output of `btrfs subvolume list`.
///
/// Lines that do not describe a subvolume are skipped. All entries are
/// reported writable; read-only state comes from a separate `-r` listing.
pub fn parse_subvolume_list(output: &str) -> SnapResult<Vec<SubvolumeInfo>> {
    let mut subvolumes = Vec::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = SUBVOLUME_LINE.captures(line) else {
            tracing::warn!(line, "Skipping unrecognised subvolume list line");
            continue;
        };

        let id = caps[1]
            .parse::<u64>()
            .map_err(|_| SnapError::InvalidSubvolumeId {
                value: caps[1].to_string(),
            })?;
        let path = caps[2].trim_end_matches('/');
        let name = path.rsplit('/').next().unwrap_or(path);

        subvolumes.push(SubvolumeInfo::new(id, name, false));
    }

    Ok(subvolumes)
}

/// Parse the output of `btrfs subvolume get-default`.
///
/// Only the leading `ID <n>` is taken into account.
pub fn parse_default_subvolume(output: &str) -> SnapResult<u64> {
    let output = output.trim();
    let caps = DEFAULT_SUBVOLUME.captures(output).ok_or_else(|| {
        SnapError::primitive(
            "btrfs subvolume get-default",
            format!("invalid output: {output}"),
        )
    })?;

    caps[1]
        .parse::<u64>()
        .map_err(|_| SnapError::InvalidSubvolumeId {
            value: caps[1].to_string(),
        })
}

/// Parse the output of `btrfs property get -ts <path> ro`.
pub fn parse_readonly_property(output: &str) -> SnapResult<bool> {
    match output.trim().strip_prefix("ro=") {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        _ => Err(SnapError::primitive(
            "btrfs property get",
            format!("invalid output: {}", output.trim()),
        )),
    }
}
