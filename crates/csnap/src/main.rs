//! container-snap CLI entry point.

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use csnap::cli::Cli;

const LOG_TARGETS: [&str; 4] = ["csnap", "csnap_btrfs", "csnap_image", "container_snap"];

/// `RUST_LOG` if set, otherwise `info` for our crates and `warn` for the rest.
/// `--debug` raises our crates to `debug` on top of either.
fn log_filter(debug: bool) -> Result<EnvFilter> {
    let (mut filter, level) = match (EnvFilter::try_from_default_env(), debug) {
        (Ok(env), false) => return Ok(env),
        (Ok(env), true) => (env, "debug"),
        (Err(_), true) => (EnvFilter::new("warn"), "debug"),
        (Err(_), false) => (EnvFilter::new("warn"), "info"),
    };
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{target}={level}").parse()?);
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(log_filter(cli.debug)?)
        .init();

    // Execute command
    cli.execute().await
}
